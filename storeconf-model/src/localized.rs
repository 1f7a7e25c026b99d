//! Localized field normalization.
//!
//! The service projects a localized field to a bare string when the request
//! carries a language header, and returns the full language map otherwise.
//! The normalizer turns either projection into a [`LocalizedText`] that can
//! be compared against the configuration's declared translations.

use serde_json::Value;
use std::collections::BTreeSet;
use storeconf_types::{LocalizedText, LocalizedValue};

use crate::{ModelError, ModelResult};

/// Normalizes wire values of one localized field against the language keys
/// the configuration declares for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedFieldNormalizer {
    declared: BTreeSet<String>,
}

impl LocalizedFieldNormalizer {
    /// Creates a normalizer for the given declared language keys.
    pub fn new<I, S>(declared: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            declared: declared.into_iter().map(Into::into).collect(),
        }
    }

    /// Takes the declared keys from a configured value: the keys of a
    /// language map, nothing for any other shape.
    pub fn from_declared(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => Self::new(map.keys().cloned()),
            _ => Self::default(),
        }
    }

    /// Declared language keys, sorted.
    pub fn declared(&self) -> impl Iterator<Item = &str> {
        self.declared.iter().map(String::as_str)
    }

    /// Normalizes a raw wire value.
    pub fn normalize(&self, wire: &Value) -> ModelResult<LocalizedText> {
        let value = LocalizedValue::from_wire(wire)
            .ok_or_else(|| ModelError::UnsupportedLocalizedShape(json_kind(wire)))?;
        self.normalize_value(&value)
    }

    /// Normalizes an already classified wire value.
    ///
    /// A bare string is placed under the single declared key; with zero or
    /// several declared keys the projection cannot be attributed to a
    /// language and an error is returned. A map passes through with
    /// non-string entries dropped.
    pub fn normalize_value(&self, value: &LocalizedValue) -> ModelResult<LocalizedText> {
        match value {
            LocalizedValue::Scalar(text) => {
                let mut keys = self.declared.iter();
                match (keys.next(), keys.next()) {
                    (Some(only), None) => Ok(LocalizedText::single(only.clone(), text.clone())),
                    (None, _) => Err(ModelError::MissingLanguage),
                    (Some(_), Some(_)) => Err(ModelError::AmbiguousLocalization {
                        declared: self.declared.iter().cloned().collect(),
                    }),
                }
            }
            LocalizedValue::Localized(map) => Ok(map
                .iter()
                .filter_map(|(language, v)| v.as_str().map(|s| (language.clone(), s.to_string())))
                .collect()),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
