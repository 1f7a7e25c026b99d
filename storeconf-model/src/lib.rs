//! Configuration model for storeconf.
//!
//! Defines the typed configuration tree and its wire transcoding:
//! - [`AttributeDefinition`]: a self-referential attribute node whose
//!   [`AttributeKind`] carries exactly the data its type allows
//! - [`codec`]: recursive, lossless conversion between attribute trees and
//!   the remote service's wire JSON
//! - [`SchemaDocument`] / [`SchemaDraft`]: top-level schema resources
//! - [`LocalizedFieldNormalizer`]: resolves scalar-vs-language-map wire
//!   projections against the declared language keys
//!
//! These types are consumed by the sync engine, which never inspects
//! attribute wire shapes directly.

mod attribute;
pub mod codec;
mod error;
mod localized;
mod schema;

pub use attribute::{
    ArraySpec, AttributeDefinition, AttributeKind, AttributeMetadata, AttributeType,
};
pub use codec::{decode, decode_all, encode, encode_all, validate_attributes};
pub use error::{ModelError, ModelResult};
pub use localized::LocalizedFieldNormalizer;
pub use schema::{SchemaDocument, SchemaDraft, ServerMetadata};
