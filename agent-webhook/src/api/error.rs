//! API Error Handling
//!
//! Transport-level failures only. Problems with a command are reported on
//! the issue, never through the HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => {
                tracing::debug!("Rejecting delivery: {}", msg);
                (StatusCode::BAD_REQUEST, msg)
            }
            ApiError::Forbidden(msg) => {
                tracing::warn!("Rejecting delivery: {}", msg);
                (StatusCode::FORBIDDEN, msg)
            }
        };

        (status, message).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
