//! Collections that keep exactly one default member.
//!
//! Deleting the default member of such a collection would leave it without
//! one, so the default is first moved to another member, the move is
//! confirmed by reading that member back, and only then is the original
//! re-read for its current version and deleted. Callers hold the collection's [`CollectionLease`] throughout.
//!
//! [`CollectionLease`]: crate::CollectionLease

use serde_json::{json, Value};
use storeconf_cloud::{
    encode_segment, send, send_json, CancelSignal, GatewayRequest, RemoteResourceGateway,
};
use storeconf_types::ResourceId;
use tracing::{debug, info};

use crate::{SyncError, SyncResult};

/// What a member delete ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The member was deleted without touching any other member.
    Deleted,
    /// The default moved to `new_default` before the member was deleted.
    Reassigned { new_default: ResourceId },
    /// The member was already gone.
    AlreadyGone,
}

/// Member operations on a default-member collection of one tenant.
pub struct DefaultMemberCollection<'a> {
    gateway: &'a dyn RemoteResourceGateway,
    /// `{tenant}/{collection}`.
    base_path: String,
    default_field: &'a str,
}

impl<'a> DefaultMemberCollection<'a> {
    pub fn new(
        gateway: &'a dyn RemoteResourceGateway,
        base_path: impl Into<String>,
        default_field: &'a str,
    ) -> Self {
        Self {
            gateway,
            base_path: base_path.into(),
            default_field,
        }
    }

    fn member_path(&self, id: &str) -> String {
        format!("{}/{}", self.base_path, encode_segment(id))
    }

    fn is_default(&self, member: &Value) -> bool {
        member.get(self.default_field).and_then(Value::as_bool) == Some(true)
    }

    /// All members, in the order the service lists them.
    pub async fn list(&self, cancel: &CancelSignal) -> SyncResult<Vec<Value>> {
        let page: Value =
            send_json(self.gateway, &GatewayRequest::get(&self.base_path), cancel).await?;
        match page.get("results") {
            Some(Value::Array(results)) => Ok(results.clone()),
            _ => Err(SyncError::decode(
                self.base_path.clone(),
                "expected a `results` array",
            )),
        }
    }

    pub async fn get(&self, id: &ResourceId, cancel: &CancelSignal) -> SyncResult<Value> {
        let member =
            send_json(self.gateway, &GatewayRequest::get(self.member_path(id.as_str())), cancel)
                .await?;
        Ok(member)
    }

    /// Deletes a member, moving the default elsewhere first when needed.
    pub async fn delete_member(
        &self,
        id: &ResourceId,
        cancel: &CancelSignal,
    ) -> SyncResult<DeleteOutcome> {
        let target = match self.get(id, cancel).await {
            Ok(member) => member,
            Err(e) if e.is_not_found() => {
                info!("{} already deleted", self.member_path(id.as_str()));
                return Ok(DeleteOutcome::AlreadyGone);
            }
            Err(e) => return Err(e),
        };

        if !self.is_default(&target) {
            self.delete(id, &target, cancel).await?;
            return Ok(DeleteOutcome::Deleted);
        }

        let members = self.list(cancel).await?;
        if members.len() <= 1 {
            debug!("{} is the only member", self.member_path(id.as_str()));
            self.delete(id, &target, cancel).await?;
            return Ok(DeleteOutcome::Deleted);
        }

        let successor = members
            .iter()
            .filter(|m| member_id(m) != Some(id.as_str()))
            .find(|m| !self.is_default(m))
            .and_then(member_id)
            .map(ResourceId::new)
            .ok_or_else(|| {
                SyncError::invariant(format!(
                    "no member of {} can take over `{}`",
                    self.base_path, self.default_field
                ))
            })?;

        self.reassign_default(&successor, cancel).await?;

        // Clearing the old flag is a write of its own and moves the version.
        match self.get(id, cancel).await {
            Ok(current) => self.delete(id, &current, cancel).await?,
            Err(e) if e.is_not_found() => {
                debug!("{} vanished after reassignment", self.member_path(id.as_str()));
            }
            Err(e) => return Err(e),
        }
        info!(
            "deleted default {} after moving the default to {}",
            id, successor
        );
        Ok(DeleteOutcome::Reassigned {
            new_default: successor,
        })
    }

    /// Flags `id` as the default and reads it back to confirm.
    async fn reassign_default(&self, id: &ResourceId, cancel: &CancelSignal) -> SyncResult<()> {
        let mut body = serde_json::Map::new();
        body.insert(self.default_field.to_string(), json!(true));
        send(
            self.gateway,
            &GatewayRequest::patch(self.member_path(id.as_str()), Value::Object(body)),
            cancel,
        )
        .await?;

        let confirmed = self.get(id, cancel).await?;
        if !self.is_default(&confirmed) {
            return Err(SyncError::invariant(format!(
                "{} did not become the default; original left in place",
                self.member_path(id.as_str())
            )));
        }
        debug!("{} is now the default", self.member_path(id.as_str()));
        Ok(())
    }

    async fn delete(&self, id: &ResourceId, member: &Value, cancel: &CancelSignal) -> SyncResult<()> {
        let mut path = self.member_path(id.as_str());
        if let Some(version) = member.get("version").and_then(Value::as_u64) {
            path = format!("{path}?version={version}");
        }
        match send(self.gateway, &GatewayRequest::delete(path), cancel).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn member_id(member: &Value) -> Option<&str> {
    member.get("id").and_then(Value::as_str)
}
