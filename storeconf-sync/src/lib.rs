//! Reconciliation engine for storeconf.
//!
//! Keeps declared configuration and the remote service's stored state in
//! step across create, read, update, delete and import.
//!
//! # Architecture
//!
//! The remote service is not a faithful mirror of what was written: some
//! fields are never echoed back, some writes return stale data, and lists
//! come back reordered. Every lifecycle operation therefore writes, reads
//! the resource back, and merges three views of it.
//!
//! ## Components
//!
//! - **Policy**: static per-field visibility policies ([`PolicyTable`])
//! - **Merge**: three-way reconciliation of desired, previous and actual
//!   state ([`StateMerger`])
//! - **Change sets**: minimal partial updates with explicit nulls
//!   ([`ChangeSetBuilder`]); extension members diffed into their own calls
//! - **Guard**: per-tenant, per-collection serialization
//!   ([`TenantSerializationGuard`]) and the delete-of-default algorithm
//!   ([`DefaultMemberCollection`])
//! - **Engine**: the lifecycle operations ([`SyncEngine`])
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use storeconf_cloud::{CancelSignal, GatewayConfig, HttpGateway};
//! use storeconf_sync::{SyncConfig, SyncEngine, SHIPPING_ZONE};
//! use storeconf_types::TenantId;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = HttpGateway::new(GatewayConfig {
//!     base_url: "https://api.example.com".into(),
//!     ..Default::default()
//! })?;
//! let engine = SyncEngine::new(Arc::new(gateway), SyncConfig::default());
//! let tenant = TenantId::parse("my-shop")?;
//!
//! let desired = json!({"key": "eu", "name": "Europe"});
//! let desired = desired.as_object().cloned().unwrap_or_default();
//! let state = engine
//!     .create(&tenant, &SHIPPING_ZONE, &desired, &CancelSignal::none())
//!     .await?;
//! println!("created {}", state.id);
//! # Ok(())
//! # }
//! ```

mod changeset;
mod collection;
mod engine;
mod error;
mod extension;
pub mod fields;
mod guard;
mod merge;
mod policy;
mod resources;
pub mod validate;

pub use changeset::{ChangeSet, ChangeSetBuilder};
pub use collection::{DefaultMemberCollection, DeleteOutcome};
pub use engine::{ResourceState, SyncConfig, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use extension::{diff_extensions, ExtensionAction};
pub use fields::FieldMap;
pub use guard::{CollectionLease, GuardKey, TenantSerializationGuard};
pub use merge::{Drift, MergeOutcome, ReconciliationView, StateMerger};
pub use policy::{FieldPolicy, FieldShape, FieldSpec, PolicyTable};
pub use resources::{ResourceDescriptor, SCHEMA_TABLE, SHIPPING_METHOD, SHIPPING_ZONE};
