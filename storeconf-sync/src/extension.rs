//! Add-on members stored in their own collection under a parent resource.
//!
//! Such members are never folded into the parent's partial update. They are
//! diffed by key into individual actions, each written through its own call.

use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use storeconf_cloud::{encode_segment, GatewayRequest};

use crate::fields::same_value;
use crate::{SyncError, SyncResult};

/// One write against an extension collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionAction {
    /// Create a member from its full body.
    Add { body: Value },
    /// Patch the changed fields of an existing member.
    Update { key: String, changes: Map<String, Value> },
    /// Delete a member.
    Remove { key: String },
}

impl ExtensionAction {
    /// Key of the member this action touches.
    pub fn key<'a>(&'a self, key_field: &str) -> Option<&'a str> {
        match self {
            ExtensionAction::Add { body } => body.get(key_field).and_then(Value::as_str),
            ExtensionAction::Update { key, .. } | ExtensionAction::Remove { key } => Some(key),
        }
    }

    /// Request for this action under `{parent}/{collection}`.
    pub fn request(&self, parent: &str, collection: &str) -> GatewayRequest {
        let base = format!("{parent}/{collection}");
        match self {
            ExtensionAction::Add { body } => GatewayRequest::post(base, body.clone()),
            ExtensionAction::Update { key, changes } => GatewayRequest::patch(
                format!("{base}/{}", encode_segment(key)),
                Value::Object(changes.clone()),
            ),
            ExtensionAction::Remove { key } => {
                GatewayRequest::delete(format!("{base}/{}", encode_segment(key)))
            }
        }
    }
}

/// Diffs desired members against previously recorded ones.
///
/// Removals come first (recorded order), then updates and additions in
/// desired order, so a key freed by a removal can be reused by an addition.
pub fn diff_extensions(
    key_field: &str,
    desired: &[Value],
    previous: &[Value],
) -> SyncResult<Vec<ExtensionAction>> {
    let wanted = index_by_key(key_field, desired)?;
    let recorded = index_by_key(key_field, previous)?;
    let wanted_keys: BTreeSet<&str> = wanted.iter().map(|(k, _)| *k).collect();
    let recorded_by_key: HashMap<&str, &Map<String, Value>> = recorded.iter().copied().collect();

    let mut actions = Vec::new();
    for (key, _) in &recorded {
        if !wanted_keys.contains(key) {
            actions.push(ExtensionAction::Remove {
                key: key.to_string(),
            });
        }
    }

    let mut additions = Vec::new();
    for (key, member) in &wanted {
        match recorded_by_key.get(key) {
            Some(old) => {
                let changes = member_changes(key_field, member, old);
                if !changes.is_empty() {
                    actions.push(ExtensionAction::Update {
                        key: key.to_string(),
                        changes,
                    });
                }
            }
            None => additions.push(ExtensionAction::Add {
                body: Value::Object(
                    member
                        .iter()
                        .filter(|(_, v)| !v.is_null())
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                ),
            }),
        }
    }
    actions.extend(additions);
    Ok(actions)
}

fn index_by_key<'a>(
    key_field: &str,
    members: &'a [Value],
) -> SyncResult<Vec<(&'a str, &'a Map<String, Value>)>> {
    let mut seen = BTreeSet::new();
    members
        .iter()
        .enumerate()
        .map(|(i, member)| {
            let object = member.as_object().ok_or_else(|| {
                SyncError::invariant(format!("extension member {i} is not an object"))
            })?;
            let key = object
                .get(key_field)
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    SyncError::invariant(format!(
                        "extension member {i} has no string `{key_field}`"
                    ))
                })?;
            if !seen.insert(key) {
                return Err(SyncError::invariant(format!(
                    "duplicate extension member `{key_field}` {key:?}"
                )));
            }
            Ok((key, object))
        })
        .collect()
}

fn member_changes(
    key_field: &str,
    wanted: &Map<String, Value>,
    recorded: &Map<String, Value>,
) -> Map<String, Value> {
    let names: BTreeSet<&str> = wanted
        .keys()
        .chain(recorded.keys())
        .map(String::as_str)
        .filter(|name| *name != key_field)
        .collect();
    names
        .into_iter()
        .filter_map(|name| {
            let w = wanted.get(name);
            (!same_value(w, recorded.get(name))).then(|| {
                (
                    name.to_string(),
                    w.filter(|v| !v.is_null()).cloned().unwrap_or(Value::Null),
                )
            })
        })
        .collect()
}
