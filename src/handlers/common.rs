use crate::errors::{ApiError, ServiceError};
use crate::ApiResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use validator::Validate;

/// Standard success response wrapped in the uniform envelope
pub fn success_response<T: Serialize>(message: impl Into<String>, data: Vec<T>) -> Response {
    (StatusCode::OK, Json(ApiResponse::ok(message, data))).into_response()
}

/// Standard created response wrapped in the uniform envelope
pub fn created_response<T: Serialize>(message: impl Into<String>, data: Vec<T>) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::ok(message, data))).into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}
