//! Minimal partial-update payloads.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::debug;

use crate::fields::{present, same_set, same_value, FieldMap};
use crate::policy::{FieldShape, PolicyTable};

/// Top-level fields to send in a partial update. Cleared fields map to
/// `null`; unchanged fields are not present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    fields: Map<String, Value>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Changed field names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// The request body.
    pub fn to_body(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn into_body(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Diffs desired configuration against the previously recorded state.
///
/// Actual state never takes part: the change set describes what the user
/// changed, not what the service drifted to.
#[derive(Debug, Clone, Copy)]
pub struct ChangeSetBuilder<'a> {
    table: &'a PolicyTable,
}

impl<'a> ChangeSetBuilder<'a> {
    pub fn new(table: &'a PolicyTable) -> Self {
        Self { table }
    }

    pub fn build(&self, desired: &FieldMap, previous: &FieldMap) -> ChangeSet {
        let names: BTreeSet<&str> = desired
            .keys()
            .chain(previous.keys())
            .map(String::as_str)
            .collect();

        let mut changes = ChangeSet::default();
        for name in names {
            let shape = self.table.shape(name);
            let wanted = present(desired, name);
            let recorded = present(previous, name);
            let change = match shape {
                FieldShape::Extension { .. } => None,
                FieldShape::Set => (!same_set(wanted, recorded)).then(|| value_or_null(wanted)),
                FieldShape::Compound => compound_change(wanted, recorded),
                FieldShape::Scalar | FieldShape::Localized => {
                    (!same_value(wanted, recorded)).then(|| value_or_null(wanted))
                }
            };
            if let Some(value) = change {
                changes.fields.insert(name.to_string(), value);
            }
        }

        debug!("change set touches {} fields", changes.len());
        changes
    }
}

fn value_or_null(value: Option<&Value>) -> Value {
    value.cloned().unwrap_or(Value::Null)
}

/// Nested diff of a compound field. `None` means unchanged.
fn compound_change(wanted: Option<&Value>, recorded: Option<&Value>) -> Option<Value> {
    let wanted = wanted.filter(|v| !is_cleared_object(v));
    let recorded = recorded.filter(|v| !is_cleared_object(v));
    match (wanted, recorded) {
        (None, None) => None,
        (None, Some(_)) => Some(Value::Null),
        (Some(Value::Object(wanted)), Some(Value::Object(recorded))) => {
            let nested: BTreeSet<&str> = wanted
                .keys()
                .chain(recorded.keys())
                .map(String::as_str)
                .collect();
            let diff: Map<String, Value> = nested
                .into_iter()
                .filter_map(|key| {
                    let w = wanted.get(key).filter(|v| !v.is_null());
                    let r = recorded.get(key).filter(|v| !v.is_null());
                    (!same_value(w, r)).then(|| (key.to_string(), value_or_null(w)))
                })
                .collect();
            (!diff.is_empty()).then_some(Value::Object(diff))
        }
        (Some(wanted), recorded) => {
            (!same_value(Some(wanted), recorded)).then(|| strip_nulls(wanted))
        }
    }
}

/// An object whose nested fields are all absent or `null`.
fn is_cleared_object(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|o| o.values().all(Value::is_null))
}

fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(o) => Value::Object(
            o.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}
