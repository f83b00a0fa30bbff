//! Error types for the issuance service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the issuance service.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(std::net::SocketAddr, std::io::Error),

    /// Request path did not match a recognized identity spec.
    #[error("no such route: {0}")]
    RouteNotFound(String),

    /// A blocking issuance task failed to complete.
    #[error("issuance task failed: {0}")]
    TaskFailed(String),

    /// Issuance or bundle construction error.
    #[error(transparent)]
    Pki(#[from] certsmith_pki::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Self::Pki(certsmith_pki::Error::PolicyViolation(_)) => {
                (StatusCode::BAD_REQUEST, "policy_violation")
            }
            Self::Pki(certsmith_pki::Error::ReservedName(_)) => {
                (StatusCode::FORBIDDEN, "reserved_name")
            }
            Self::RouteNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::BindFailed(_, _) | Self::TaskFailed(_) | Self::Pki(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        };

        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"error":"internal_error","message":"failed to serialize error"}"#.to_string()
        });

        (status, [("content-type", "application/json")], json).into_response()
    }
}
