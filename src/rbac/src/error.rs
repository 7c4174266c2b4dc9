//! Error types for role resolution and request authorization

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Role-based access control errors
///
/// Denials are not errors: a forbidden or unmatched request is a normal
/// [`Verdict`](crate::engine::Verdict). Errors here mean the decision could
/// not be made at all.
#[derive(Debug, Error)]
pub enum RbacError {
    /// Role store unreachable or returned a failure
    #[error("Role query failed: {0}")]
    RoleQuery(String),

    /// Invalid configuration, detected at setup time
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Session lookup failure
    #[error("Session error: {0}")]
    Session(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON document
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for access control operations
pub type Result<T> = std::result::Result<T, RbacError>;

impl IntoResponse for RbacError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            RbacError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            RbacError::RoleQuery(_) => (StatusCode::INTERNAL_SERVER_ERROR, "role_resolution_failed"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": error,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
