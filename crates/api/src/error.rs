//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{OrderError, UserError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Missing, malformed or expired credentials.
    Unauthorized(String),
    /// Authenticated but not allowed.
    Forbidden(String),
    /// Order lifecycle error.
    Order(OrderError),
    /// User account error.
    User(UserError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Order(err) => order_error_to_response(err),
            ApiError::User(err) => user_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn order_error_to_response(err: OrderError) -> (StatusCode, String) {
    let status = match &err {
        OrderError::NotFound(_) => StatusCode::NOT_FOUND,
        OrderError::OwnershipMismatch { .. } => StatusCode::FORBIDDEN,
        OrderError::InvalidTransition { .. } | OrderError::ConcurrentModification(_) => {
            StatusCode::CONFLICT
        }
        OrderError::InvalidInput(_)
        | OrderError::MissingTransaction
        | OrderError::PaymentNotAllowed => StatusCode::BAD_REQUEST,
        OrderError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

fn user_error_to_response(err: UserError) -> (StatusCode, String) {
    let status = match &err {
        UserError::NotFound(_) => StatusCode::NOT_FOUND,
        UserError::EmailTaken(_) | UserError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        UserError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        UserError::Banned => StatusCode::FORBIDDEN,
        UserError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
        UserError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        ApiError::User(err)
    }
}
