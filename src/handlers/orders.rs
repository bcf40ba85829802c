use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::{
    auth::{AdminUser, AuthUser},
    entities::OrderStatus,
    errors::ApiError,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Creates the router for order endpoints
pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/cash-order", post(create_cash_order))
        .route("/orders", get(get_my_orders))
        .route("/orders/:id", get(get_user_orders))
        .route("/orders/:id", put(update_order_status))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CashOrderRequest {
    /// Cash-on-delivery flag; the only supported payment method
    #[serde(rename = "COD")]
    pub cod: bool,
    /// Whether the cart's discounted total should be charged
    #[serde(rename = "couponApplied", default)]
    pub coupon_applied: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// Commit the caller's cart as a cash-on-delivery order.
#[utoipa::path(
    post,
    path = "/api/v1/cash-order",
    request_body = CashOrderRequest,
    responses(
        (status = 201, description = "Order created; stock decremented"),
        (status = 400, description = "COD not selected or no cart to commit"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Insufficient stock for a line item"),
    ),
    security(("Bearer" = []))
)]
pub async fn create_cash_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CashOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !payload.cod {
        return Err(ApiError::ValidationError(
            "Creating a cash order requires cash on delivery".to_string(),
        ));
    }

    let order = state
        .services
        .order
        .create_cash_order(user.user_id, payload.coupon_applied)
        .await
        .map_err(map_service_error)?;

    Ok(created_response("Order created", vec![order]))
}

/// The caller's own orders, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "Orders with line snapshots"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("Bearer" = []))
)]
pub async fn get_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .order
        .get_orders_for_user(user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response("User orders", orders))
}

/// A given user's orders (admin).
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Orders with line snapshots"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "User not found"),
    ),
    security(("Bearer" = []))
)]
pub async fn get_user_orders(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .order
        .get_orders_for_user(user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response("User orders", orders))
}

/// Advance an order's status (admin). Rejects values outside the fixed
/// enumeration and moves the payment status in the same write.
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Order not found"),
    ),
    security(("Bearer" = []))
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .order
        .update_order_status(order_id, payload.status)
        .await
        .map_err(map_service_error)?;

    Ok(success_response("Order status changed", vec![order]))
}
