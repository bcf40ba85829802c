use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input,
};
use crate::{
    auth::AdminUser,
    errors::ApiError,
    services::coupons::{CreateCouponInput, UpdateCouponInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for coupon administration
pub fn coupons_routes() -> Router<AppState> {
    Router::new()
        .route("/coupons", post(create_coupon))
        .route("/coupons", get(list_coupons))
        .route("/coupons/:id", get(get_coupon))
        .route("/coupons/:id", put(update_coupon))
        .route("/coupons/:id", delete(delete_coupon))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub expiry: DateTime<Utc>,
    /// Percentage discount applied to the cart total
    pub discount: Decimal,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCouponRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub discount: Option<Decimal>,
}

#[utoipa::path(
    post,
    path = "/api/v1/coupons",
    request_body = CreateCouponRequest,
    responses(
        (status = 201, description = "Coupon created"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "Coupon name already exists"),
    ),
    security(("Bearer" = []))
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(payload): Json<CreateCouponRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let coupon = state
        .services
        .coupon
        .create_coupon(CreateCouponInput {
            name: payload.name,
            expiry: payload.expiry,
            discount: payload.discount,
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response("Coupon created", vec![coupon]))
}

#[utoipa::path(
    get,
    path = "/api/v1/coupons",
    responses(
        (status = 200, description = "All coupons"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an admin"),
    ),
    security(("Bearer" = []))
)]
pub async fn list_coupons(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let coupons = state
        .services
        .coupon
        .list_coupons()
        .await
        .map_err(map_service_error)?;

    Ok(success_response("Coupons", coupons))
}

#[utoipa::path(
    get,
    path = "/api/v1/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon id")),
    responses(
        (status = 200, description = "Coupon"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Coupon not found"),
    ),
    security(("Bearer" = []))
)]
pub async fn get_coupon(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let coupon = state
        .services
        .coupon
        .get_coupon(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response("Coupon", vec![coupon]))
}

#[utoipa::path(
    put,
    path = "/api/v1/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon id")),
    request_body = UpdateCouponRequest,
    responses(
        (status = 200, description = "Coupon updated"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Coupon not found"),
        (status = 409, description = "Coupon name already exists"),
    ),
    security(("Bearer" = []))
)]
pub async fn update_coupon(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCouponRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let coupon = state
        .services
        .coupon
        .update_coupon(
            id,
            UpdateCouponInput {
                name: payload.name,
                expiry: payload.expiry,
                discount: payload.discount,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response("Coupon updated", vec![coupon]))
}

#[utoipa::path(
    delete,
    path = "/api/v1/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon id")),
    responses(
        (status = 200, description = "Coupon deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Coupon not found"),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_coupon(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let coupon = state
        .services
        .coupon
        .delete_coupon(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response("Coupon deleted", vec![coupon]))
}
