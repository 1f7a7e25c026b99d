//! Checks run on desired configuration before any request is sent.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::Value;

use crate::fields::{present, FieldMap};
use crate::{SyncError, SyncResult};

/// Two date fields that must not be inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: &'static str,
    pub until: &'static str,
}

/// A compound field whose nested `requires` must all be set when it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Companions {
    pub field: &'static str,
    pub requires: &'static [&'static str],
}

/// Parses an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date(field: &str, value: &Value) -> SyncResult<DateTime<Utc>> {
    let text = value
        .as_str()
        .ok_or_else(|| SyncError::invariant(format!("{field} must be a date string")))?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| SyncError::invariant(format!("{field} is not a valid date: {text:?}")))
}

/// Rejects `from` later than `until`. Either side may be absent.
pub fn check_date_range(fields: &FieldMap, range: &DateRange) -> SyncResult<()> {
    let (Some(from), Some(until)) = (present(fields, range.from), present(fields, range.until))
    else {
        return Ok(());
    };
    let from_ts = parse_date(range.from, from)?;
    let until_ts = parse_date(range.until, until)?;
    if from_ts > until_ts {
        return Err(SyncError::invariant(format!(
            "{} ({from_ts}) is after {} ({until_ts})",
            range.from, range.until
        )));
    }
    Ok(())
}

/// Rejects a set compound field missing any of its required nested fields.
pub fn check_companions(fields: &FieldMap, rule: &Companions) -> SyncResult<()> {
    let Some(value) = present(fields, rule.field) else {
        return Ok(());
    };
    let object = value
        .as_object()
        .ok_or_else(|| SyncError::invariant(format!("{} must be an object", rule.field)))?;
    let missing: Vec<&str> = rule
        .requires
        .iter()
        .copied()
        .filter(|name| object.get(*name).is_none_or(Value::is_null))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SyncError::invariant(format!(
            "{} requires {}",
            rule.field,
            missing.join(", ")
        )))
    }
}
