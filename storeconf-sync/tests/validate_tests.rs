mod common;

use common::fields;
use serde_json::json;
use storeconf_sync::validate::{check_companions, check_date_range, parse_date, Companions, DateRange};
use storeconf_sync::{SyncError, SHIPPING_METHOD, SHIPPING_ZONE};

const RANGE: DateRange = DateRange {
    from: "validFrom",
    until: "validUntil",
};

// ── Dates ────────────────────────────────────────────────────────

#[test]
fn parses_timestamps_and_plain_dates() {
    let ts = parse_date("d", &json!("2024-03-01T12:00:00+01:00")).unwrap();
    assert_eq!(ts.to_rfc3339(), "2024-03-01T11:00:00+00:00");
    let day = parse_date("d", &json!("2024-03-01")).unwrap();
    assert_eq!(day.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    assert!(parse_date("d", &json!("yesterday")).is_err());
    assert!(parse_date("d", &json!(20240301)).is_err());
}

#[test]
fn inverted_range_is_rejected() {
    let desired = fields(json!({"validFrom": "2024-06-01", "validUntil": "2024-01-01"}));
    let err = check_date_range(&desired, &RANGE).unwrap_err();
    assert!(matches!(err, SyncError::InvariantViolation(_)));
    assert!(err.to_string().contains("validFrom"));
}

#[test]
fn ordered_or_open_ranges_pass() {
    let ordered = fields(json!({"validFrom": "2024-01-01", "validUntil": "2024-01-01T00:00:00Z"}));
    assert!(check_date_range(&ordered, &RANGE).is_ok());
    let open = fields(json!({"validFrom": "2024-01-01", "validUntil": null}));
    assert!(check_date_range(&open, &RANGE).is_ok());
}

// ── Companions ──────────────────────────────────────────────────

#[test]
fn compound_missing_a_companion_is_rejected() {
    let rule = Companions {
        field: "freeAbove",
        requires: &["centAmount", "currencyCode"],
    };
    let desired = fields(json!({"freeAbove": {"centAmount": 5000}}));
    let err = check_companions(&desired, &rule).unwrap_err();
    assert!(err.to_string().contains("currencyCode"));

    let complete = fields(json!({"freeAbove": {"centAmount": 5000, "currencyCode": "EUR"}}));
    assert!(check_companions(&complete, &rule).is_ok());
    assert!(check_companions(&fields(json!({})), &rule).is_ok());
}

// ── Descriptors ─────────────────────────────────────────────────

#[test]
fn shipping_method_runs_all_checks() {
    assert!(SHIPPING_METHOD.is_guarded());
    assert!(!SHIPPING_ZONE.is_guarded());

    let bad_dates = fields(json!({"validFrom": "2025-01-01", "validUntil": "2024-01-01"}));
    assert!(SHIPPING_METHOD.validate(&bad_dates).is_err());

    let bad_money = fields(json!({"freeAbove": {"currencyCode": "EUR"}}));
    assert!(SHIPPING_METHOD.validate(&bad_money).is_err());

    let fine = fields(json!({"key": "std", "freeAbove": {"centAmount": 1, "currencyCode": "EUR"}}));
    assert!(SHIPPING_METHOD.validate(&fine).is_ok());
    assert!(SHIPPING_ZONE.validate(&bad_dates).is_ok());
}
