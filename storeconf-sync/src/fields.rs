//! Field maps and the value comparisons the merger and change sets share.

use serde_json::{Map, Value};

/// Flat field map of one resource. A missing key means "not present"; a
/// JSON `null` is read the same way.
pub type FieldMap = Map<String, Value>;

/// Looks up a field, treating `null` as absent.
pub fn present<'a>(fields: &'a FieldMap, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|v| !v.is_null())
}

/// Absent, `null`, `""`, `[]` and `{}` are all empty.
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(_) => false,
    }
}

/// Compares two optional values with `null` equal to absent.
pub fn same_value(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a.filter(|v| !v.is_null()), b.filter(|v| !v.is_null())) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Multiset equality: same elements with the same multiplicities, in any
/// order.
pub fn same_elements(a: &[Value], b: &[Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|item| {
        match b
            .iter()
            .enumerate()
            .position(|(i, other)| !used[i] && other == item)
        {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

/// [`same_value`] for set-valued fields: arrays compare as multisets.
pub fn same_set(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a.filter(|v| !v.is_null()), b.filter(|v| !v.is_null())) {
        (Some(Value::Array(a)), Some(Value::Array(b))) => same_elements(a, b),
        (a, b) => same_value(a, b),
    }
}

/// Copy of `fields` with every `null` entry removed.
pub fn without_nulls(fields: &FieldMap) -> FieldMap {
    fields
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
