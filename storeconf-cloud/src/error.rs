//! Gateway error types.

use thiserror::Error;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while talking to the remote service.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The target no longer exists remotely (HTTP 404).
    #[error("not found: {path}")]
    NotFound { path: String },

    /// Any other non-2xx response. Never retried.
    #[error("remote rejected request with status {status}: {body}")]
    RemoteRejected { status: u16, body: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GatewayError {
    /// Returns true if the remote target is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }

    /// Returns true for both explicit cancellation and an elapsed deadline.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Cancelled | GatewayError::DeadlineExceeded)
    }

    /// HTTP status of a rejected request.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::RemoteRejected { status, .. } => Some(*status),
            GatewayError::NotFound { .. } => Some(404),
            GatewayError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
