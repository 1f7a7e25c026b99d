//! Model error types.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while decoding, validating or normalizing configuration.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Wire payload does not match the shape implied by its declared type.
    #[error("decode error at {path}: {reason}")]
    Decode { path: String, reason: String },

    /// A configured tree breaks a data-model invariant.
    #[error("invariant violated at {path}: {reason}")]
    Invariant { path: String, reason: String },

    /// A bare string arrived but several languages are declared.
    #[error("ambiguous localized value: bare string with declared languages {declared:?}")]
    AmbiguousLocalization { declared: Vec<String> },

    /// A bare string arrived but no language is declared.
    #[error("localized value is a bare string but no language is declared")]
    MissingLanguage,

    #[error("unsupported localized value shape: {0}")]
    UnsupportedLocalizedShape(&'static str),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ModelError {
    pub(crate) fn decode(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invariant(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invariant {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
