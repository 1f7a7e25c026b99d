//! Per-tenant, per-collection serialization.
//!
//! Some collections carry an invariant spanning several members (exactly
//! one default member). Operations on such a collection must not interleave
//! within one tenant, while other tenants and kinds proceed uncontended.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use storeconf_cloud::CancelSignal;
use storeconf_types::{CollectionKind, TenantId};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::SyncResult;

/// Key of one serialization lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GuardKey {
    pub tenant: TenantId,
    pub kind: CollectionKind,
}

/// Registry of collection locks, created lazily and never removed.
///
/// The registry mutex is held only while looking up or inserting an entry;
/// waiting happens on the per-key async mutex.
#[derive(Debug, Default)]
pub struct TenantSerializationGuard {
    locks: Mutex<HashMap<GuardKey, Arc<tokio::sync::Mutex<()>>>>,
}

/// Held lock on one (tenant, kind). Released on drop.
#[derive(Debug)]
pub struct CollectionLease {
    key: GuardKey,
    _lock: OwnedMutexGuard<()>,
}

impl CollectionLease {
    pub fn key(&self) -> &GuardKey {
        &self.key
    }
}

impl Drop for CollectionLease {
    fn drop(&mut self) {
        debug!("released {}/{}", self.key.tenant, self.key.kind);
    }
}

impl TenantSerializationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the lock of `(tenant, kind)`, giving up when `cancel` fires.
    pub async fn acquire(
        &self,
        tenant: &TenantId,
        kind: &CollectionKind,
        cancel: &CancelSignal,
    ) -> SyncResult<CollectionLease> {
        cancel.check()?;
        let key = GuardKey {
            tenant: tenant.clone(),
            kind: kind.clone(),
        };
        let lock = self.lock_for(&key);
        let held = tokio::select! {
            biased;
            err = cancel.fired() => return Err(err.into()),
            held = lock.lock_owned() => held,
        };
        debug!("acquired {}/{}", key.tenant, key.kind);
        Ok(CollectionLease { key, _lock: held })
    }

    /// Number of (tenant, kind) pairs seen so far.
    pub fn tracked_keys(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lock_for(&self, key: &GuardKey) -> Arc<tokio::sync::Mutex<()>> {
        // A panic elsewhere cannot leave the map half-updated.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }
}
