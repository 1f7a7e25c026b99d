mod common;

use common::fields;
use pretty_assertions::assert_eq;
use serde_json::json;
use storeconf_sync::{
    FieldPolicy, FieldShape, FieldSpec, PolicyTable, ReconciliationView, StateMerger, SyncError,
};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("name"),
    FieldSpec::new(
        "description",
        FieldPolicy::PreserveUnlessUserChanged,
        FieldShape::Localized,
    ),
    FieldSpec::new(
        "secret",
        FieldPolicy::PreserveUnlessUserChanged,
        FieldShape::Scalar,
    ),
    FieldSpec::new(
        "taxCategory",
        FieldPolicy::PreserveIfUserSupplied,
        FieldShape::Compound,
    ),
    FieldSpec::new(
        "note",
        FieldPolicy::PreserveIfUserSupplied,
        FieldShape::Localized,
    ),
    FieldSpec::set("countries"),
];

const TABLE: PolicyTable = PolicyTable::new(FIELDS);

fn merge(
    desired: serde_json::Value,
    previous: serde_json::Value,
    actual: serde_json::Value,
) -> storeconf_sync::MergeOutcome {
    let (desired, previous, actual) = (fields(desired), fields(previous), fields(actual));
    StateMerger::new()
        .merge(&ReconciliationView::new(&TABLE, &desired, &previous, &actual))
        .unwrap()
}

// ── Policy table ─────────────────────────────────────────────────

#[test]
fn unlisted_fields_are_authoritative_scalars() {
    assert_eq!(TABLE.policy("createdAt"), FieldPolicy::Authoritative);
    assert_eq!(TABLE.shape("createdAt"), FieldShape::Scalar);
    assert_eq!(TABLE.policy("secret"), FieldPolicy::PreserveUnlessUserChanged);
    assert!(TABLE.shape("countries").is_set());
    assert_eq!(TABLE.extensions().count(), 0);
}

// ── Authoritative ────────────────────────────────────────────────

#[test]
fn authoritative_takes_actual() {
    let out = merge(
        json!({"name": "mine"}),
        json!({"name": "mine"}),
        json!({"name": "theirs", "createdAt": "2024-01-01T00:00:00Z"}),
    );
    assert_eq!(out.state, fields(json!({"name": "theirs", "createdAt": "2024-01-01T00:00:00Z"})));
    assert!(out.drift.is_empty());
}

#[test]
fn authoritative_absent_in_actual_is_absent() {
    let out = merge(json!({"name": "mine"}), json!({"name": "mine"}), json!({}));
    assert!(!out.state.contains_key("name"));
}

// ── PreserveUnlessUserChanged ───────────────────────────────────

#[test]
fn unchanged_field_keeps_previous_when_not_echoed() {
    let out = merge(json!({"secret": "s3"}), json!({"secret": "s3"}), json!({}));
    assert_eq!(out.state.get("secret"), Some(&json!("s3")));
    assert!(out.drift.is_empty());
}

#[test]
fn unchanged_field_keeps_previous_and_reports_drift() {
    let out = merge(
        json!({"secret": "s3"}),
        json!({"secret": "s3"}),
        json!({"secret": "rotated"}),
    );
    assert_eq!(out.state.get("secret"), Some(&json!("s3")));
    assert_eq!(out.drift.len(), 1);
    assert_eq!(out.drift[0].field, "secret");
    assert_eq!(out.drift[0].recorded, json!("s3"));
    assert_eq!(out.drift[0].actual, json!("rotated"));
}

#[test]
fn changed_field_prefers_desired() {
    let out = merge(
        json!({"secret": "new"}),
        json!({"secret": "old"}),
        json!({"secret": "stale"}),
    );
    assert_eq!(out.state.get("secret"), Some(&json!("new")));
    assert!(out.drift.is_empty());
}

#[test]
fn user_removed_field_is_dropped() {
    let out = merge(json!({}), json!({"secret": "old"}), json!({"secret": "old"}));
    assert!(!out.state.contains_key("secret"));
}

#[test]
fn import_adopts_actual() {
    let out = merge(json!({}), json!({}), json!({"secret": "remote"}));
    assert_eq!(out.state.get("secret"), Some(&json!("remote")));
}

// ── PreserveIfUserSupplied ──────────────────────────────────────

#[test]
fn undeclared_and_empty_stays_absent() {
    let out = merge(json!({}), json!({}), json!({"taxCategory": {}}));
    assert!(!out.state.contains_key("taxCategory"));
}

#[test]
fn undeclared_but_present_reflects_actual() {
    let out = merge(json!({}), json!({}), json!({"taxCategory": {"id": "std"}}));
    assert_eq!(out.state.get("taxCategory"), Some(&json!({"id": "std"})));
}

#[test]
fn declared_and_present_reflects_actual() {
    let out = merge(
        json!({"taxCategory": {"id": "std"}}),
        json!({}),
        json!({"taxCategory": {"id": "reduced"}}),
    );
    assert_eq!(out.state.get("taxCategory"), Some(&json!({"id": "reduced"})));
}

#[test]
fn declared_but_missing_remotely_becomes_absent() {
    let out = merge(
        json!({"taxCategory": {"id": "std"}}),
        json!({"taxCategory": {"id": "std"}}),
        json!({}),
    );
    assert!(!out.state.contains_key("taxCategory"));
}

#[test]
fn declared_empty_stays_declared_empty() {
    let out = merge(json!({"taxCategory": {}}), json!({}), json!({}));
    assert_eq!(out.state.get("taxCategory"), Some(&json!({})));
}

#[test]
fn null_counts_as_absent() {
    let out = merge(json!({"taxCategory": null}), json!({}), json!({"taxCategory": null}));
    assert!(!out.state.contains_key("taxCategory"));
}

// ── Set-valued fields ───────────────────────────────────────────

#[test]
fn same_elements_keep_desired_order() {
    let out = merge(
        json!({"countries": ["DE", "AT", "CH"]}),
        json!({"countries": ["DE", "AT", "CH"]}),
        json!({"countries": ["AT", "CH", "DE"]}),
    );
    assert_eq!(out.state.get("countries"), Some(&json!(["DE", "AT", "CH"])));
}

#[test]
fn different_elements_adopt_actual_order() {
    let out = merge(
        json!({"countries": ["DE", "AT"]}),
        json!({"countries": ["DE", "AT"]}),
        json!({"countries": ["FR", "DE", "AT"]}),
    );
    assert_eq!(out.state.get("countries"), Some(&json!(["FR", "DE", "AT"])));
}

#[test]
fn multiplicity_matters() {
    let out = merge(
        json!({"countries": ["DE", "DE", "AT"]}),
        json!({}),
        json!({"countries": ["AT", "DE", "AT"]}),
    );
    assert_eq!(out.state.get("countries"), Some(&json!(["AT", "DE", "AT"])));
}

// ── Localized fields ────────────────────────────────────────────

#[test]
fn bare_string_is_attributed_to_the_declared_language() {
    let out = merge(
        json!({"description": {"en": "Hello"}}),
        json!({"description": {"en": "Hello"}}),
        json!({"description": "Hello"}),
    );
    assert_eq!(out.state.get("description"), Some(&json!({"en": "Hello"})));
    assert!(out.drift.is_empty());
}

#[test]
fn bare_string_with_several_languages_is_an_error() {
    let (desired, actual) = (
        fields(json!({"note": {"en": "Hi", "de": "Hallo"}})),
        fields(json!({"note": "Hi"})),
    );
    let err = StateMerger::new()
        .merge(&ReconciliationView::new(&TABLE, &desired, &desired, &actual))
        .unwrap_err();
    assert!(matches!(err, SyncError::Localization(_)));
}

#[test]
fn language_map_filters_non_string_entries() {
    let out = merge(
        json!({"note": {"en": "Hi"}}),
        json!({}),
        json!({"note": {"en": "Hi", "de": 7}}),
    );
    assert_eq!(out.state.get("note"), Some(&json!({"en": "Hi"})));
}

#[test]
fn undeclared_bare_string_is_kept_verbatim() {
    let out = merge(json!({}), json!({}), json!({"note": "Hi"}));
    assert_eq!(out.state.get("note"), Some(&json!("Hi")));
}

#[test]
fn localized_drift_compares_normalized_values() {
    let out = merge(
        json!({"description": {"en": "Hello"}}),
        json!({"description": {"en": "Hello"}}),
        json!({"description": "Howdy"}),
    );
    assert_eq!(out.state.get("description"), Some(&json!({"en": "Hello"})));
    assert_eq!(out.drift.len(), 1);
    assert_eq!(out.drift[0].actual, json!({"en": "Howdy"}));
}
