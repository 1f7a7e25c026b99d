//! Localized text.
//!
//! The remote service stores human-readable fields as language maps
//! (`{"en": "Shirt", "de": "Hemd"}`), but projects them to a bare string when
//! a request carries a language header. [`LocalizedValue`] models that wire
//! shape as a closed union; [`LocalizedText`] is the normalized map form.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A map from language tag to text, ordered by language tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map holding a single translation.
    #[must_use]
    pub fn single(language: impl Into<String>, text: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(language.into(), text.into());
        Self(map)
    }

    /// Inserts or replaces the translation for `language`.
    pub fn insert(&mut self, language: impl Into<String>, text: impl Into<String>) {
        self.0.insert(language.into(), text.into());
    }

    /// Returns the translation for `language`.
    #[must_use]
    pub fn get(&self, language: &str) -> Option<&str> {
        self.0.get(language).map(String::as_str)
    }

    /// Iterates over the declared language tags.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Converts to a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LocalizedText {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Wire shape of a field whose projection depends on a request header.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalizedValue {
    /// Header-projected single string.
    Scalar(String),
    /// Full language map. Entries are kept as raw JSON; non-string entries
    /// are dropped during normalization.
    Localized(BTreeMap<String, Value>),
}

impl LocalizedValue {
    /// Classifies a wire value. Returns `None` for shapes that are neither a
    /// string nor an object.
    #[must_use]
    pub fn from_wire(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Scalar(s.clone())),
            Value::Object(map) => Some(Self::Localized(
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            )),
            _ => None,
        }
    }
}
