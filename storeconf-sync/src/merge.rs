//! Three-way state merge.
//!
//! For every field the merger combines the user's desired configuration,
//! the state recorded after the previous operation and the state just read
//! from the service, according to the field's [`FieldPolicy`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use storeconf_model::LocalizedFieldNormalizer;
use storeconf_types::LocalizedValue;
use tracing::{debug, warn};

use crate::fields::{is_empty, present, same_elements, same_set, same_value, FieldMap};
use crate::policy::{FieldPolicy, FieldShape, PolicyTable};
use crate::SyncResult;

/// Desired, previous and actual field maps of one resource, for one call.
#[derive(Debug, Clone, Copy)]
pub struct ReconciliationView<'a> {
    pub table: &'a PolicyTable,
    pub desired: &'a FieldMap,
    pub previous: &'a FieldMap,
    pub actual: &'a FieldMap,
}

impl<'a> ReconciliationView<'a> {
    pub fn new(
        table: &'a PolicyTable,
        desired: &'a FieldMap,
        previous: &'a FieldMap,
        actual: &'a FieldMap,
    ) -> Self {
        Self {
            table,
            desired,
            previous,
            actual,
        }
    }

    /// Every field named by any of the three maps, sorted.
    fn field_names(&self) -> BTreeSet<&'a str> {
        self.desired
            .keys()
            .chain(self.previous.keys())
            .chain(self.actual.keys())
            .map(String::as_str)
            .collect()
    }
}

/// A preserved field whose value the service reports differently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drift {
    pub field: String,
    /// Value kept in state.
    pub recorded: Value,
    /// Value the service reported.
    pub actual: Value,
}

/// Merged state plus the drift observed while producing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub state: FieldMap,
    pub drift: Vec<Drift>,
}

/// Applies a [`PolicyTable`] to a [`ReconciliationView`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StateMerger;

impl StateMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merges the view into the state returned to the orchestrator.
    ///
    /// Localized fields in `actual` are normalized first, using the language
    /// keys declared in desired (or, failing that, previous).
    pub fn merge(&self, view: &ReconciliationView<'_>) -> SyncResult<MergeOutcome> {
        let mut outcome = MergeOutcome::default();

        for name in view.field_names() {
            let spec_policy = view.table.policy(name);
            let shape = view.table.shape(name);
            let desired = present(view.desired, name);
            let previous = present(view.previous, name);
            let normalized;
            let actual = match (shape, present(view.actual, name)) {
                (FieldShape::Localized, Some(wire)) => {
                    normalized = normalize_localized(wire, desired.or(previous))?;
                    Some(&normalized)
                }
                (_, actual) => actual,
            };

            let same = |a: Option<&Value>, b: Option<&Value>| {
                if shape.is_set() {
                    same_set(a, b)
                } else {
                    same_value(a, b)
                }
            };

            let chosen = match spec_policy {
                FieldPolicy::Authoritative => actual,
                FieldPolicy::PreserveUnlessUserChanged => {
                    if desired.is_none() && previous.is_none() {
                        actual
                    } else if same(desired, previous) {
                        if let (Some(kept), Some(reported)) = (previous, actual) {
                            if !same(Some(kept), Some(reported)) {
                                warn!(
                                    "field {name} drifted remotely; keeping recorded value"
                                );
                                outcome.drift.push(Drift {
                                    field: name.to_string(),
                                    recorded: kept.clone(),
                                    actual: reported.clone(),
                                });
                            }
                        }
                        previous
                    } else {
                        desired
                    }
                }
                FieldPolicy::PreserveIfUserSupplied => match desired {
                    Some(declared) if is_empty(actual) => {
                        is_empty(Some(declared)).then_some(declared)
                    }
                    _ if is_empty(actual) => None,
                    _ => actual,
                },
            };

            let Some(chosen) = chosen else {
                continue;
            };
            let value = match (shape.is_set(), desired, chosen) {
                (true, Some(Value::Array(wanted)), Value::Array(got))
                    if same_elements(wanted, got) =>
                {
                    Value::Array(wanted.clone())
                }
                _ => chosen.clone(),
            };
            outcome.state.insert(name.to_string(), value);
        }

        debug!(
            "merged {} fields ({} drifted)",
            outcome.state.len(),
            outcome.drift.len()
        );
        Ok(outcome)
    }
}

/// Normalizes a localized wire value against the declared shape of the
/// field. Without a declaration a language map passes through and a bare
/// string is kept as-is.
fn normalize_localized(wire: &Value, declared: Option<&Value>) -> SyncResult<Value> {
    match declared {
        Some(declared @ Value::Object(_)) => {
            let normalizer = LocalizedFieldNormalizer::from_declared(Some(declared));
            Ok(normalizer.normalize(wire)?.to_json())
        }
        _ => match LocalizedValue::from_wire(wire) {
            Some(LocalizedValue::Localized(_)) => Ok(LocalizedFieldNormalizer::default()
                .normalize(wire)?
                .to_json()),
            _ => Ok(wire.clone()),
        },
    }
}
