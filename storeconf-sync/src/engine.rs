//! Lifecycle operations.
//!
//! Every operation follows the same shape: validate desired configuration
//! and plan every extension action, write (full body or change set), read
//! the resource back, and merge desired, previous and actual into the state
//! handed to the orchestrator. Calls within one operation are strictly
//! sequential, and nothing is sent until planning has succeeded.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use storeconf_cloud::{
    encode_segment, send, send_json, CancelSignal, GatewayRequest, RemoteResourceGateway,
};
use storeconf_model::{SchemaDocument, SchemaDraft};
use storeconf_types::{CollectionKind, ResourceId, TenantId};
use tracing::{debug, info, warn};

use crate::changeset::ChangeSetBuilder;
use crate::collection::{DefaultMemberCollection, DeleteOutcome};
use crate::extension::{diff_extensions, ExtensionAction};
use crate::fields::{without_nulls, FieldMap};
use crate::guard::{CollectionLease, TenantSerializationGuard};
use crate::merge::{Drift, ReconciliationView, StateMerger};
use crate::policy::FieldShape;
use crate::resources::{ResourceDescriptor, SCHEMA_TABLE};
use crate::{SyncError, SyncResult};

const ACCEPT_LANGUAGE: &str = "Accept-Language";

/// Extension actions per collection, computed before the first write.
type ExtensionPlan = Vec<(&'static str, Vec<ExtensionAction>)>;

/// Configuration for the sync engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Sent on reads; the service then projects localized fields to bare
    /// strings in this language.
    pub accept_language: Option<String>,
    /// Deadline applied to every operation, on top of the caller's signal.
    pub operation_timeout_secs: Option<u64>,
}

/// State of a flat resource after an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub id: ResourceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    pub fields: FieldMap,
    /// Preserved fields the service reported differently on this read.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drift: Vec<Drift>,
}

/// Runs lifecycle operations against a [`RemoteResourceGateway`].
pub struct SyncEngine {
    gateway: Arc<dyn RemoteResourceGateway>,
    guard: Arc<TenantSerializationGuard>,
    config: SyncConfig,
}

impl SyncEngine {
    /// Creates an engine with its own lock registry.
    pub fn new(gateway: Arc<dyn RemoteResourceGateway>, config: SyncConfig) -> Self {
        Self::with_guard(gateway, Arc::new(TenantSerializationGuard::new()), config)
    }

    /// Creates an engine sharing `guard` with other engines.
    pub fn with_guard(
        gateway: Arc<dyn RemoteResourceGateway>,
        guard: Arc<TenantSerializationGuard>,
        config: SyncConfig,
    ) -> Self {
        Self {
            gateway,
            guard,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn guard(&self) -> &Arc<TenantSerializationGuard> {
        &self.guard
    }

    fn signal(&self, cancel: &CancelSignal) -> CancelSignal {
        match self.config.operation_timeout_secs {
            Some(secs) => cancel.clone().with_timeout(Duration::from_secs(secs)),
            None => cancel.clone(),
        }
    }

    fn read_request(&self, path: String) -> GatewayRequest {
        let request = GatewayRequest::get(path);
        match &self.config.accept_language {
            Some(language) => request.with_header(ACCEPT_LANGUAGE, language.as_str()),
            None => request,
        }
    }

    // ── Schemas ──────────────────────────────────────────────────

    /// Creates a schema and returns it as stored.
    pub async fn create_schema(
        &self,
        tenant: &TenantId,
        draft: &SchemaDraft,
        cancel: &CancelSignal,
    ) -> SyncResult<SchemaDocument> {
        draft.validate()?;
        let cancel = self.signal(cancel);
        let request = GatewayRequest::post(schemas_path(tenant), draft.to_wire());
        let created: Value = send_json(self.gateway.as_ref(), &request, &cancel).await?;
        let id = wire_id(&created, "schema.id")?;
        info!("created schema {id} in {tenant}");

        let actual = self.fetch_schema(tenant, &id, &cancel).await?;
        merge_schema(Some(draft), None, actual)
    }

    /// Reads a schema. `recorded` is the state returned by the previous
    /// operation, if any.
    pub async fn read_schema(
        &self,
        tenant: &TenantId,
        id: &ResourceId,
        recorded: Option<&SchemaDocument>,
        cancel: &CancelSignal,
    ) -> SyncResult<SchemaDocument> {
        let cancel = self.signal(cancel);
        let actual = self.fetch_schema(tenant, id, &cancel).await?;
        let desired = recorded.map(SchemaDocument::draft);
        merge_schema(desired.as_ref(), recorded, actual)
    }

    /// Replaces a schema wholesale. `version` is the last version seen.
    pub async fn update_schema(
        &self,
        tenant: &TenantId,
        id: &ResourceId,
        version: u64,
        draft: &SchemaDraft,
        recorded: Option<&SchemaDocument>,
        cancel: &CancelSignal,
    ) -> SyncResult<SchemaDocument> {
        draft.validate()?;
        let cancel = self.signal(cancel);
        let request = GatewayRequest::put(schema_path(tenant, id), draft.to_update_wire(version));
        send(self.gateway.as_ref(), &request, &cancel).await?;
        info!("updated schema {id} in {tenant} (from version {version})");

        let actual = self.fetch_schema(tenant, id, &cancel).await?;
        merge_schema(Some(draft), recorded, actual)
    }

    /// Deletes a schema. A schema that is already gone counts as deleted.
    pub async fn delete_schema(
        &self,
        tenant: &TenantId,
        id: &ResourceId,
        version: u64,
        cancel: &CancelSignal,
    ) -> SyncResult<()> {
        let cancel = self.signal(cancel);
        let path = format!("{}?version={version}", schema_path(tenant, id));
        match send(self.gateway.as_ref(), &GatewayRequest::delete(path), &cancel).await {
            Ok(_) => {
                info!("deleted schema {id} in {tenant}");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!("schema {id} in {tenant} already deleted");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Adopts an existing schema with nothing recorded.
    pub async fn import_schema(
        &self,
        tenant: &TenantId,
        id: &ResourceId,
        cancel: &CancelSignal,
    ) -> SyncResult<SchemaDocument> {
        self.read_schema(tenant, id, None, cancel).await
    }

    async fn fetch_schema(
        &self,
        tenant: &TenantId,
        id: &ResourceId,
        cancel: &CancelSignal,
    ) -> SyncResult<Value> {
        let request = self.read_request(schema_path(tenant, id));
        Ok(send_json(self.gateway.as_ref(), &request, cancel).await?)
    }

    // ── Flat resources ───────────────────────────────────────────

    /// Creates a resource, its extension members, and reads it back.
    ///
    /// A failure after the parent was created is reported as
    /// [`SyncError::PartiallyCreated`] so the new id is never lost.
    pub async fn create(
        &self,
        tenant: &TenantId,
        descriptor: &ResourceDescriptor,
        desired: &FieldMap,
        cancel: &CancelSignal,
    ) -> SyncResult<ResourceState> {
        descriptor.validate(desired)?;
        let nothing = FieldMap::new();
        let plan = plan_extensions(descriptor, desired, &nothing)?;
        let cancel = self.signal(cancel);
        let _lease = self.lease(tenant, descriptor, &cancel).await?;

        let mut body = without_nulls(desired);
        body.retain(|name, _| !descriptor.table.is_extension(name));
        let request = GatewayRequest::post(collection_path(tenant, descriptor), Value::Object(body));
        let created: Value = send_json(self.gateway.as_ref(), &request, &cancel).await?;
        let id = wire_id(&created, "id")?;
        info!("created {} {id} in {tenant}", descriptor.collection);

        self.finish_create(tenant, descriptor, &id, desired, &plan, &cancel)
            .await
            .map_err(|source| {
                warn!("{} {id} created but not completed: {source}", descriptor.collection);
                SyncError::PartiallyCreated {
                    id: id.clone(),
                    source: Box::new(source),
                }
            })
    }

    async fn finish_create(
        &self,
        tenant: &TenantId,
        descriptor: &ResourceDescriptor,
        id: &ResourceId,
        desired: &FieldMap,
        plan: &ExtensionPlan,
        cancel: &CancelSignal,
    ) -> SyncResult<ResourceState> {
        let parent = member_path(tenant, descriptor, id);
        self.apply_extensions(&parent, plan, cancel).await?;
        let actual = self.fetch(tenant, descriptor, id, cancel).await?;
        reconcile(descriptor, desired, &FieldMap::new(), actual)
    }

    /// Refreshes recorded state from the service.
    pub async fn read(
        &self,
        tenant: &TenantId,
        descriptor: &ResourceDescriptor,
        recorded: &ResourceState,
        cancel: &CancelSignal,
    ) -> SyncResult<ResourceState> {
        let cancel = self.signal(cancel);
        let _lease = self.lease(tenant, descriptor, &cancel).await?;
        let actual = self.fetch(tenant, descriptor, &recorded.id, &cancel).await?;
        reconcile(descriptor, &recorded.fields, &recorded.fields, actual)
    }

    /// Sends the minimal change set, then extension actions, then reads back.
    pub async fn update(
        &self,
        tenant: &TenantId,
        descriptor: &ResourceDescriptor,
        recorded: &ResourceState,
        desired: &FieldMap,
        cancel: &CancelSignal,
    ) -> SyncResult<ResourceState> {
        descriptor.validate(desired)?;
        let plan = plan_extensions(descriptor, desired, &recorded.fields)?;
        let cancel = self.signal(cancel);
        let _lease = self.lease(tenant, descriptor, &cancel).await?;

        let parent = member_path(tenant, descriptor, &recorded.id);
        let changes = ChangeSetBuilder::new(&descriptor.table).build(desired, &recorded.fields);
        if changes.is_empty() {
            debug!("{parent}: no field changes");
        } else {
            let request = GatewayRequest::patch(parent.clone(), changes.to_body());
            send(self.gateway.as_ref(), &request, &cancel).await?;
            info!("updated {parent} ({} fields)", changes.len());
        }
        self.apply_extensions(&parent, &plan, &cancel).await?;

        let actual = self.fetch(tenant, descriptor, &recorded.id, &cancel).await?;
        reconcile(descriptor, desired, &recorded.fields, actual)
    }

    /// Deletes a resource. In a default-member collection a default member
    /// hands the default to another member first.
    pub async fn delete(
        &self,
        tenant: &TenantId,
        descriptor: &ResourceDescriptor,
        id: &ResourceId,
        cancel: &CancelSignal,
    ) -> SyncResult<DeleteOutcome> {
        let cancel = self.signal(cancel);
        let _lease = self.lease(tenant, descriptor, &cancel).await?;

        if let Some(default_field) = descriptor.default_field {
            let collection = DefaultMemberCollection::new(
                self.gateway.as_ref(),
                collection_path(tenant, descriptor),
                default_field,
            );
            return collection.delete_member(id, &cancel).await;
        }

        let request = GatewayRequest::delete(member_path(tenant, descriptor, id));
        match send(self.gateway.as_ref(), &request, &cancel).await {
            Ok(_) => {
                info!("deleted {} {id} in {tenant}", descriptor.collection);
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) if e.is_not_found() => Ok(DeleteOutcome::AlreadyGone),
            Err(e) => Err(e.into()),
        }
    }

    /// Adopts an existing resource with nothing recorded or desired.
    pub async fn import(
        &self,
        tenant: &TenantId,
        descriptor: &ResourceDescriptor,
        id: &ResourceId,
        cancel: &CancelSignal,
    ) -> SyncResult<ResourceState> {
        let cancel = self.signal(cancel);
        let _lease = self.lease(tenant, descriptor, &cancel).await?;
        let actual = self.fetch(tenant, descriptor, id, &cancel).await?;
        let nothing = FieldMap::new();
        reconcile(descriptor, &nothing, &nothing, actual)
    }

    async fn lease(
        &self,
        tenant: &TenantId,
        descriptor: &ResourceDescriptor,
        cancel: &CancelSignal,
    ) -> SyncResult<Option<CollectionLease>> {
        if !descriptor.is_guarded() {
            return Ok(None);
        }
        let kind = CollectionKind::from(descriptor.collection);
        Ok(Some(self.guard.acquire(tenant, &kind, cancel).await?))
    }

    /// Reads the parent resource and every extension collection into one
    /// logical resource.
    async fn fetch(
        &self,
        tenant: &TenantId,
        descriptor: &ResourceDescriptor,
        id: &ResourceId,
        cancel: &CancelSignal,
    ) -> SyncResult<ResourceState> {
        let parent = member_path(tenant, descriptor, id);
        let wire: Value =
            send_json(self.gateway.as_ref(), &self.read_request(parent.clone()), cancel).await?;
        let Value::Object(mut fields) = wire else {
            return Err(SyncError::decode(parent, "expected a resource object"));
        };
        let id = match fields.remove("id") {
            Some(Value::String(id)) => ResourceId::new(id),
            _ => return Err(SyncError::decode(format!("{parent}.id"), "expected a string id")),
        };
        let version = fields.remove("version").and_then(|v| v.as_u64());

        for spec in descriptor.table.extensions() {
            let FieldShape::Extension { collection, .. } = spec.shape else {
                continue;
            };
            let path = format!("{parent}/{collection}");
            let page: Value =
                send_json(self.gateway.as_ref(), &self.read_request(path.clone()), cancel).await?;
            let members = match page.get("results") {
                Some(Value::Array(members)) => members.clone(),
                _ => return Err(SyncError::decode(path, "expected a `results` array")),
            };
            fields.insert(spec.name.to_string(), Value::Array(members));
        }

        debug!("fetched {parent} (version {version:?})");
        Ok(ResourceState {
            id,
            version,
            fields,
            drift: Vec::new(),
        })
    }

    async fn apply_extensions(
        &self,
        parent: &str,
        plan: &ExtensionPlan,
        cancel: &CancelSignal,
    ) -> SyncResult<()> {
        for (collection, actions) in plan {
            for action in actions {
                send(self.gateway.as_ref(), &action.request(parent, collection), cancel).await?;
            }
            if !actions.is_empty() {
                info!("{parent}/{collection}: applied {} member actions", actions.len());
            }
        }
        Ok(())
    }
}

/// Diffs every extension collection up front; malformed members fail here.
fn plan_extensions(
    descriptor: &ResourceDescriptor,
    desired: &FieldMap,
    previous: &FieldMap,
) -> SyncResult<ExtensionPlan> {
    let mut plan = Vec::new();
    for spec in descriptor.table.extensions() {
        let FieldShape::Extension {
            collection,
            key_field,
        } = spec.shape
        else {
            continue;
        };
        let actions = diff_extensions(
            key_field,
            members(desired, spec.name),
            members(previous, spec.name),
        )?;
        plan.push((collection, actions));
    }
    Ok(plan)
}

fn schemas_path(tenant: &TenantId) -> String {
    format!("{tenant}/schemas")
}

fn schema_path(tenant: &TenantId, id: &ResourceId) -> String {
    format!("{tenant}/schemas/{}", encode_segment(id.as_str()))
}

fn collection_path(tenant: &TenantId, descriptor: &ResourceDescriptor) -> String {
    format!("{tenant}/{}", descriptor.collection)
}

fn member_path(tenant: &TenantId, descriptor: &ResourceDescriptor, id: &ResourceId) -> String {
    format!(
        "{}/{}",
        collection_path(tenant, descriptor),
        encode_segment(id.as_str())
    )
}

fn wire_id(created: &Value, path: &str) -> SyncResult<ResourceId> {
    created
        .get("id")
        .and_then(Value::as_str)
        .map(ResourceId::new)
        .ok_or_else(|| SyncError::decode(path, "response carries no string id"))
}

fn members<'a>(fields: &'a FieldMap, name: &str) -> &'a [Value] {
    fields
        .get(name)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn reconcile(
    descriptor: &ResourceDescriptor,
    desired: &FieldMap,
    previous: &FieldMap,
    actual: ResourceState,
) -> SyncResult<ResourceState> {
    let view = ReconciliationView::new(&descriptor.table, desired, previous, &actual.fields);
    let merged = StateMerger::new().merge(&view)?;
    Ok(ResourceState {
        id: actual.id,
        version: actual.version,
        fields: merged.state,
        drift: merged.drift,
    })
}

fn merge_schema(
    desired: Option<&SchemaDraft>,
    recorded: Option<&SchemaDocument>,
    actual: Value,
) -> SyncResult<SchemaDocument> {
    let Value::Object(actual) = actual else {
        return Err(SyncError::decode("schema", "expected a schema object"));
    };
    let desired = desired.map(|d| object(d.to_wire())).unwrap_or_default();
    let previous = recorded
        .map(|r| object(r.draft().to_wire()))
        .unwrap_or_default();
    let view = ReconciliationView::new(&SCHEMA_TABLE, &desired, &previous, &actual);
    let merged = StateMerger::new().merge(&view)?;
    Ok(SchemaDocument::from_wire(&Value::Object(merged.state))?)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
