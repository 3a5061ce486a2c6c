//! API error types and their HTTP rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::message::StoreError;
use crate::observability::{Logger, Severity};

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors a handler can surface to a client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// POST body had an empty `message`.
    #[error("'message' param cannot be an empty string")]
    EmptyMessage,

    /// Path id did not parse as a non-negative integer.
    #[error("invalid message id: {0}")]
    InvalidId(String),

    /// The requested message does not exist.
    #[error("message not found")]
    NotFound,

    /// Storage-layer failure. The detail is logged at the boundary and
    /// never sent to the client.
    #[error("internal storage error")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::EmptyMessage | ApiError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal failures are logged in full but rendered generically.
        if let ApiError::Internal(ref detail) = self {
            Logger::log_stderr(
                Severity::Error,
                "request_failed",
                &[("status", status.as_str()), ("detail", detail)],
            );
        }

        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("unknown")
                .to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CorruptRecord;

    #[test]
    fn status_codes_follow_the_contract() {
        assert_eq!(ApiError::EmptyMessage.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidId("abc".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_not_found_maps_to_404() {
        let err: ApiError = StoreError::not_found(7).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn corrupt_record_is_an_internal_error_with_generic_message() {
        let err: ApiError = StoreError::from(CorruptRecord::new("bad json")).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        // The corruption detail must not leak into the client message.
        assert_eq!(err.to_string(), "internal storage error");
    }
}
