use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input,
};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::carts::{CartLineInput, CartToggleOutcome, CartWithItems},
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", post(toggle_cart))
        .route("/cart", put(replace_cart))
        .route("/cart", get(get_cart))
        .route("/empty-cart", delete(empty_cart))
        .route("/apply-coupon", post(apply_coupon))
}

/// Requested cart line; the price never comes from the client
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CartLineRequest {
    pub product_id: Uuid,
    pub count: i32,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CartRequest {
    #[validate(length(min = 1, message = "cart must contain at least one item"))]
    pub cart: Vec<CartLineRequest>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ApplyCouponRequest {
    #[validate(length(min = 1, message = "coupon code is required"))]
    pub coupon: String,
}

fn into_lines(payload: CartRequest) -> Vec<CartLineInput> {
    payload
        .cart
        .into_iter()
        .map(|line| CartLineInput {
            product_id: line.product_id,
            count: line.count,
            color: line.color,
        })
        .collect()
}

/// Build-or-clear toggle: creates a cart from the payload, or deletes the
/// existing cart (returning it) when one is already present.
#[utoipa::path(
    post,
    path = "/api/v1/cart",
    request_body = CartRequest,
    responses(
        (status = 201, description = "Cart created with resolved prices"),
        (status = 200, description = "Existing cart deleted and returned"),
        (status = 400, description = "Missing items or unknown product"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("Bearer" = []))
)]
pub async fn toggle_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let outcome = state
        .services
        .cart
        .toggle_cart(user.user_id, into_lines(payload))
        .await
        .map_err(map_service_error)?;

    Ok(match outcome {
        CartToggleOutcome::Created(cart) => created_response("Cart created", vec![cart]),
        CartToggleOutcome::Cleared(cart) => success_response("Cart deleted", vec![cart]),
    })
}

/// Replace the caller's cart with the payload unconditionally.
#[utoipa::path(
    put,
    path = "/api/v1/cart",
    request_body = CartRequest,
    responses(
        (status = 200, description = "Cart replaced"),
        (status = 400, description = "Missing items or unknown product"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("Bearer" = []))
)]
pub async fn replace_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let cart = state
        .services
        .cart
        .replace_cart(user.user_id, into_lines(payload))
        .await
        .map_err(map_service_error)?;

    Ok(success_response("Cart replaced", vec![cart]))
}

/// The caller's current cart.
#[utoipa::path(
    get,
    path = "/api/v1/cart",
    responses(
        (status = 200, description = "Cart with items, or empty data when none"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("Bearer" = []))
)]
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .get_cart(user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(match cart {
        Some(found) => success_response("User cart", vec![found]),
        None => success_response::<CartWithItems>("User does not have a cart", vec![]),
    })
}

/// Delete the caller's cart.
#[utoipa::path(
    delete,
    path = "/api/v1/empty-cart",
    responses(
        (status = 200, description = "Cart deleted, or nothing to delete"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("Bearer" = []))
)]
pub async fn empty_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .services
        .cart
        .clear_cart(user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(match deleted {
        Some(cart) => success_response("Cart is now empty", vec![cart]),
        None => success_response::<CartWithItems>("User does not have a cart", vec![]),
    })
}

/// Apply a coupon to the caller's cart, computing the discounted total.
#[utoipa::path(
    post,
    path = "/api/v1/apply-coupon",
    request_body = ApplyCouponRequest,
    responses(
        (status = 200, description = "Cart updated with discounted total"),
        (status = 400, description = "Coupon expired or no cart to discount"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Coupon not found"),
    ),
    security(("Bearer" = []))
)]
pub async fn apply_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ApplyCouponRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let cart = state
        .services
        .cart
        .apply_coupon(user.user_id, &payload.coupon)
        .await
        .map_err(map_service_error)?;

    Ok(success_response("Coupon applied", vec![cart]))
}
