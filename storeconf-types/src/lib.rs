//! Core type definitions for storeconf.
//!
//! This crate defines the small, resource-agnostic types shared by the
//! model, gateway and sync layers:
//! - Tenant, resource and collection identifiers
//! - Localized text maps and the scalar-or-map wire union
//!
//! Resource-specific shapes (attribute trees, schema documents, shipping
//! resources) live in `storeconf-model` and `storeconf-sync`, not here.

mod ids;
mod localized;

pub use ids::{CollectionKind, ResourceId, TenantId};
pub use localized::{LocalizedText, LocalizedValue};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid identifier {value:?}: {reason}")]
    InvalidIdentifier { value: String, reason: &'static str },
}
