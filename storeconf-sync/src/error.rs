//! Error types for the sync layer.

use storeconf_cloud::GatewayError;
use storeconf_model::ModelError;
use storeconf_types::ResourceId;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in lifecycle operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Wire payload does not match its declared type.
    #[error("decode error at {path}: {reason}")]
    Decode { path: String, reason: String },

    /// The target no longer exists remotely.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// Non-2xx response other than 404. Never retried.
    #[error("remote rejected request with status {status}: {body}")]
    RemoteRejected { status: u16, body: String },

    /// Detected before any request was sent, or while confirming a
    /// multi-step write.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A localized field could not be attributed to a language.
    #[error("localization error: {0}")]
    Localization(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    /// Network or client failure below the HTTP status level.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The resource exists remotely under `id`, but a later step of its
    /// create failed.
    #[error("created {id} but did not complete: {source}")]
    PartiallyCreated {
        id: ResourceId,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    pub(crate) fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation(reason.into())
    }

    pub(crate) fn decode(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the remote target is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound { .. })
    }

    /// Returns true for both explicit cancellation and an elapsed deadline.
    pub fn is_cancelled(&self) -> bool {
        match self {
            SyncError::Cancelled | SyncError::DeadlineExceeded => true,
            SyncError::PartiallyCreated { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Id of a resource left behind by a create that did not complete.
    pub fn created_id(&self) -> Option<&ResourceId> {
        match self {
            SyncError::PartiallyCreated { id, .. } => Some(id),
            _ => None,
        }
    }
}

impl From<GatewayError> for SyncError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound { path } => SyncError::NotFound { path },
            GatewayError::RemoteRejected { status, body } => {
                SyncError::RemoteRejected { status, body }
            }
            GatewayError::Cancelled => SyncError::Cancelled,
            GatewayError::DeadlineExceeded => SyncError::DeadlineExceeded,
            GatewayError::Http(e) => SyncError::Transport(e.to_string()),
            GatewayError::Serialization(e) => SyncError::Serialization(e),
            GatewayError::Config(msg) => SyncError::Config(msg),
        }
    }
}

impl From<ModelError> for SyncError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Decode { path, reason } => SyncError::Decode { path, reason },
            ModelError::Invariant { path, reason } => {
                SyncError::InvariantViolation(format!("{path}: {reason}"))
            }
            ModelError::Serialization(e) => SyncError::Serialization(e),
            other @ (ModelError::AmbiguousLocalization { .. }
            | ModelError::MissingLanguage
            | ModelError::UnsupportedLocalizedShape(_)) => {
                SyncError::Localization(other.to_string())
            }
        }
    }
}
