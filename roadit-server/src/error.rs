//! Error types for roadit-server
//!
//! `ApiError` is what the resource endpoints return; action endpoints
//! (status update, assessment, municipality lookup) answer with their own
//! `{success, error}` envelopes instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// roadit-common error, mapped by variant
    #[error(transparent)]
    Common(#[from] roadit_common::Error),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        use roadit_common::Error as E;

        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Common(err) => match err {
                E::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
                E::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.to_string()),
                E::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, "INVALID_TRANSITION", err.to_string())
                }
                E::Storage(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORAGE_ERROR",
                    "Issue storage is unavailable.".to_string(),
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    err.to_string(),
                ),
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }

    /// Message sent to the client
    pub fn client_message(&self) -> String {
        self.parts().2
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", self);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
