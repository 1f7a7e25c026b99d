//! Shared test helpers: an in-memory stand-in for the remote service.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use storeconf_cloud::{GatewayRequest, GatewayResult, Method, RawResponse, RemoteResourceGateway};
use storeconf_sync::FieldMap;

/// Installs a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds a field map from a JSON object literal.
pub fn fields(value: Value) -> FieldMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[derive(Default)]
struct Store {
    /// Collection path -> members in list order.
    collections: BTreeMap<String, Vec<Value>>,
    next_id: u64,
    requests: Vec<GatewayRequest>,
}

/// In-memory service speaking the same paths and status codes as the real
/// one. Every call yields once so concurrent operations interleave.
#[derive(Default)]
pub struct FakeService {
    store: Mutex<Store>,
    /// Fields never echoed back on single-member reads.
    hidden: HashSet<String>,
    /// Localized fields projected to a bare string under `Accept-Language`.
    localized: HashSet<String>,
    /// Fields a PATCH silently ignores.
    ignored_on_patch: HashSet<String>,
    /// Array fields returned reversed on reads.
    reordered: HashSet<String>,
    /// Collection suffixes whose POSTs are answered with 400.
    rejected_posts: HashSet<String>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hiding(mut self, field: &str) -> Self {
        self.hidden.insert(field.to_string());
        self
    }

    pub fn projecting(mut self, field: &str) -> Self {
        self.localized.insert(field.to_string());
        self
    }

    pub fn ignoring_patch_of(mut self, field: &str) -> Self {
        self.ignored_on_patch.insert(field.to_string());
        self
    }

    pub fn reordering(mut self, field: &str) -> Self {
        self.reordered.insert(field.to_string());
        self
    }

    pub fn rejecting_posts_to(mut self, suffix: &str) -> Self {
        self.rejected_posts.insert(suffix.to_string());
        self
    }

    /// Stores members as-is under `collection`.
    pub fn seed(&self, collection: &str, members: Vec<Value>) {
        let mut store = self.store.lock().unwrap();
        store
            .collections
            .entry(collection.to_string())
            .or_default()
            .extend(members);
    }

    /// Stored members of `collection`, unprojected.
    pub fn members(&self, collection: &str) -> Vec<Value> {
        let store = self.store.lock().unwrap();
        store.collections.get(collection).cloned().unwrap_or_default()
    }

    /// Stored member at `path`, unprojected.
    pub fn member(&self, path: &str) -> Option<Value> {
        let store = self.store.lock().unwrap();
        locate(&store, path).map(|(coll, i)| store.collections[&coll][i].clone())
    }

    /// `METHOD path` of every call so far.
    pub fn calls(&self) -> Vec<String> {
        let store = self.store.lock().unwrap();
        store
            .requests
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    pub fn requests(&self) -> Vec<GatewayRequest> {
        self.store.lock().unwrap().requests.clone()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.store.lock().unwrap().requests.clear();
    }

    fn handle(&self, request: &GatewayRequest) -> RawResponse {
        let mut store = self.store.lock().unwrap();
        store.requests.push(request.clone());

        let (path, query) = match request.path.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (request.path.clone(), None),
        };
        let expected_version = query
            .as_deref()
            .and_then(|q| q.strip_prefix("version="))
            .and_then(|v| v.parse::<u64>().ok());

        match request.method {
            Method::Get => {
                if let Some((coll, i)) = locate(&store, &path) {
                    let member = store.collections[&coll][i].clone();
                    return RawResponse::json(200, &self.project(member, request, true));
                }
                let listed = store.collections.get(&path).cloned().or_else(|| {
                    let sub_of_member = parent(&path).is_some_and(|p| locate(&store, p).is_some());
                    let top_level = path.split('/').count() == 2;
                    (sub_of_member || top_level).then(Vec::new)
                });
                match listed {
                    Some(members) => {
                        let results: Vec<Value> = members
                            .into_iter()
                            .map(|m| self.project(m, request, false))
                            .collect();
                        RawResponse::json(200, &json!({ "results": results }))
                    }
                    None => not_found(),
                }
            }
            Method::Post => {
                if self.rejected_posts.iter().any(|suffix| path.ends_with(suffix.as_str())) {
                    return RawResponse::json(400, &json!({"message": "invalid member"}));
                }
                let Some(Value::Object(body)) = request.body.clone() else {
                    return RawResponse::new(400, "body required");
                };
                let mut member = body;
                if key_field(&path) == "id" {
                    store.next_id += 1;
                    member.insert("id".into(), json!(format!("id-{}", store.next_id)));
                    member.insert("version".into(), json!(1));
                }
                let member = Value::Object(member);
                enforce_single_default(&mut store, &path, &member);
                store
                    .collections
                    .entry(path.clone())
                    .or_default()
                    .push(member.clone());
                RawResponse::json(201, &member)
            }
            Method::Patch => {
                let Some((coll, i)) = locate(&store, &path) else {
                    return not_found();
                };
                let Some(Value::Object(changes)) = request.body.clone() else {
                    return RawResponse::new(400, "body required");
                };
                let member = &mut store.collections.get_mut(&coll).unwrap()[i];
                let fields = member.as_object_mut().unwrap();
                for (name, value) in changes {
                    if self.ignored_on_patch.contains(&name) {
                        continue;
                    }
                    apply_change(fields, name, value);
                }
                bump(fields);
                let updated = member.clone();
                enforce_single_default(&mut store, &coll, &updated);
                RawResponse::json(200, &updated)
            }
            Method::Put => {
                let Some((coll, i)) = locate(&store, &path) else {
                    return not_found();
                };
                let Some(Value::Object(mut body)) = request.body.clone() else {
                    return RawResponse::new(400, "body required");
                };
                let member = &mut store.collections.get_mut(&coll).unwrap()[i];
                if body.get("version") != member.get("version") {
                    return RawResponse::new(409, r#"{"message":"version mismatch"}"#);
                }
                body.insert("id".into(), member["id"].clone());
                *member = Value::Object(body);
                bump(member.as_object_mut().unwrap());
                RawResponse::json(200, member)
            }
            Method::Delete => {
                let Some((coll, i)) = locate(&store, &path) else {
                    return not_found();
                };
                let members = store.collections.get_mut(&coll).unwrap();
                if let Some(expected) = expected_version {
                    if members[i].get("version").and_then(Value::as_u64) != Some(expected) {
                        return RawResponse::new(409, r#"{"message":"version mismatch"}"#);
                    }
                }
                let removed = members.remove(i);
                RawResponse::json(200, &removed)
            }
        }
    }

    fn project(&self, member: Value, request: &GatewayRequest, single: bool) -> Value {
        let Value::Object(mut fields) = member else {
            return member;
        };
        if single {
            fields.retain(|name, _| !self.hidden.contains(name));
        }
        if let Some(language) = request.header("accept-language") {
            for name in &self.localized {
                if let Some(Value::Object(map)) = fields.get(name).cloned() {
                    match map.get(language) {
                        Some(text) => fields.insert(name.clone(), text.clone()),
                        None => fields.remove(name),
                    };
                }
            }
        }
        for name in &self.reordered {
            if let Some(Value::Array(items)) = fields.get_mut(name) {
                items.reverse();
            }
        }
        Value::Object(fields)
    }
}

#[async_trait]
impl RemoteResourceGateway for FakeService {
    async fn call(&self, request: &GatewayRequest) -> GatewayResult<RawResponse> {
        tokio::task::yield_now().await;
        Ok(self.handle(request))
    }
}

fn not_found() -> RawResponse {
    RawResponse::json(404, &json!({"message": "not found"}))
}

fn parent(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

fn key_field(collection: &str) -> &'static str {
    if collection.ends_with("zone-rates") {
        "zone"
    } else {
        "id"
    }
}

fn locate(store: &Store, path: &str) -> Option<(String, usize)> {
    let (coll, key) = path.rsplit_once('/')?;
    let field = key_field(coll);
    let index = store
        .collections
        .get(coll)?
        .iter()
        .position(|m| m.get(field).and_then(Value::as_str) == Some(key))?;
    Some((coll.to_string(), index))
}

fn apply_change(fields: &mut Map<String, Value>, name: String, value: Value) {
    match value {
        Value::Null => {
            fields.remove(&name);
        }
        Value::Object(nested) if fields.get(&name).is_some_and(Value::is_object) => {
            let target = fields.get_mut(&name).unwrap().as_object_mut().unwrap();
            for (key, value) in nested {
                apply_change(target, key, value);
            }
        }
        value => {
            fields.insert(name, value);
        }
    }
}

/// Versioned members get their counter bumped; extension members have none.
fn bump(fields: &mut Map<String, Value>) {
    if let Some(version) = fields.get("version").and_then(Value::as_u64) {
        fields.insert("version".into(), json!(version + 1));
    }
}

/// Flagging one member as default clears the flag on its siblings, which
/// bumps their versions like any other write.
fn enforce_single_default(store: &mut Store, collection: &str, member: &Value) {
    if member.get("isDefault") != Some(&json!(true)) {
        return;
    }
    let id = member.get("id").cloned();
    if let Some(members) = store.collections.get_mut(collection) {
        for other in members.iter_mut() {
            if other.get("id").cloned() != id {
                if let Some(fields) = other.as_object_mut() {
                    if fields.get("isDefault") == Some(&json!(true)) {
                        fields.insert("isDefault".into(), json!(false));
                        bump(fields);
                    }
                }
            }
        }
    }
}
