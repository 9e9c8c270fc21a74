//! Error types and HTTP error mapping
//!
//! One application-level error enum covers the taxonomy the HTTP surface
//! cares about: validation problems become 400s with detail, auth and
//! lookup failures become 401/404, provider dispatch problems become 502.
//! Rendering and tracking degrade silently and never surface here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum MailcastError {
    /// Bad input: schema mismatch, missing fields, unusable campaign state
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or invalid API key
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Entity lookup failed
    #[error("not found: {0}")]
    NotFound(String),

    /// Mail provider dispatch failure
    #[error("provider error: {0}")]
    Provider(String),

    /// Job queue failure
    #[error("queue error: {0}")]
    Queue(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl MailcastError {
    /// HTTP status the error maps to
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
            Self::Queue(_) | Self::Config(_) | Self::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for MailcastError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal detail stays in the logs, not in the response body.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

/// Convenience result alias used throughout the crate
pub type Result<T, E = MailcastError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            MailcastError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MailcastError::Unauthorized("no key".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            MailcastError::NotFound("campaign".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            MailcastError::Provider("smtp down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            MailcastError::Queue("full".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_carries_detail() {
        let err = MailcastError::Validation("listId is required".into());
        assert_eq!(err.to_string(), "validation error: listId is required");
    }
}
