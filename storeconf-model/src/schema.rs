//! Schema documents as the service stores them, and the drafts sent on
//! create and update.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use storeconf_types::{LocalizedText, ResourceId};

use crate::codec::{decode_all, encode_all, validate_attributes};
use crate::{AttributeDefinition, ModelError, ModelResult};

/// A schema resource as stored by the service.
///
/// Created wholesale from a [`SchemaDraft`], replaced wholesale on update
/// (the update carries the last-known version) and deleted by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct SchemaDocument {
    pub id: ResourceId,
    pub name: LocalizedText,
    /// Ordered entity-type tags this schema applies to.
    pub entity_types: Vec<String>,
    /// Ordered top-level attribute definitions.
    pub attributes: Vec<AttributeDefinition>,
    pub metadata: ServerMetadata,
}

/// Server-maintained bookkeeping of a stored resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMetadata {
    /// Optimistic-concurrency counter, bumped by every write.
    pub version: u64,
    /// Canonical URL of the resource, when the service reports one.
    pub url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl SchemaDocument {
    /// Decodes a wire schema document. The name must already be a language
    /// map; header-projected names are normalized by the caller first.
    pub fn from_wire(wire: &Value) -> ModelResult<Self> {
        let doc = wire
            .as_object()
            .ok_or_else(|| ModelError::decode("schema", "expected a schema object"))?;

        let id = doc
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::decode("schema.id", "expected a string id"))?;
        let version = doc
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| ModelError::decode("schema.version", "expected an unsigned version"))?;
        let name = decode_name(doc.get("name"), "schema.name")?;
        let entity_types = decode_entity_types(doc.get("entityTypes"), "schema.entityTypes")?;
        let attributes = decode_all(
            doc.get("attributes")
                .ok_or_else(|| ModelError::decode("schema", "missing required field `attributes`"))?,
        )?;

        let url = match doc.get("url") {
            None | Some(Value::Null) => None,
            Some(v) => Some(
                v.as_str()
                    .ok_or_else(|| ModelError::decode("schema.url", "expected a string"))?
                    .to_string(),
            ),
        };

        Ok(Self {
            id: ResourceId::new(id),
            name,
            entity_types,
            attributes,
            metadata: ServerMetadata {
                version,
                url,
                created_at: decode_timestamp(doc.get("createdAt"), "schema.createdAt")?,
                last_modified_at: decode_timestamp(doc.get("lastModifiedAt"), "schema.lastModifiedAt")?,
            },
        })
    }

    /// Encodes the full stored document, server metadata included.
    pub fn to_wire(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("id".into(), Value::String(self.id.to_string()));
        doc.insert("version".into(), Value::from(self.metadata.version));
        doc.insert("name".into(), self.name.to_json());
        doc.insert("entityTypes".into(), entity_types_json(&self.entity_types));
        doc.insert("attributes".into(), encode_all(&self.attributes));
        if let Some(url) = &self.metadata.url {
            doc.insert("url".into(), Value::String(url.clone()));
        }
        if let Some(ts) = self.metadata.created_at {
            doc.insert("createdAt".into(), Value::String(timestamp_json(ts)));
        }
        if let Some(ts) = self.metadata.last_modified_at {
            doc.insert("lastModifiedAt".into(), Value::String(timestamp_json(ts)));
        }
        Value::Object(doc)
    }

    /// The user-configurable part of this document.
    pub fn draft(&self) -> SchemaDraft {
        SchemaDraft {
            name: self.name.clone(),
            entity_types: self.entity_types.clone(),
            attributes: self.attributes.clone(),
        }
    }

    pub fn version(&self) -> u64 {
        self.metadata.version
    }
}

impl TryFrom<Value> for SchemaDocument {
    type Error = ModelError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_wire(&value)
    }
}

impl From<SchemaDocument> for Value {
    fn from(doc: SchemaDocument) -> Self {
        doc.to_wire()
    }
}

/// The configured shape of a schema: what create and update send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDraft {
    pub name: LocalizedText,
    pub entity_types: Vec<String>,
    pub attributes: Vec<AttributeDefinition>,
}

impl SchemaDraft {
    /// Checks the draft before anything is sent.
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.is_empty() {
            return Err(ModelError::invariant("name", "name needs at least one translation"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.entity_types.iter().find(|t| !seen.insert(t.as_str())) {
            return Err(ModelError::invariant(
                "entityTypes",
                format!("duplicate entity type {dup:?}"),
            ));
        }
        validate_attributes(&self.attributes)
    }

    /// Body of a create request.
    pub fn to_wire(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("name".into(), self.name.to_json());
        doc.insert("entityTypes".into(), entity_types_json(&self.entity_types));
        doc.insert("attributes".into(), encode_all(&self.attributes));
        Value::Object(doc)
    }

    /// Body of a wholesale update carrying the last-known version.
    pub fn to_update_wire(&self, version: u64) -> Value {
        let mut body = self.to_wire();
        if let Value::Object(doc) = &mut body {
            doc.insert("version".into(), Value::from(version));
        }
        body
    }
}

/// UTC timestamps are written with a `Z` suffix, as the service writes them.
fn timestamp_json(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn entity_types_json(entity_types: &[String]) -> Value {
    Value::Array(entity_types.iter().cloned().map(Value::String).collect())
}

fn decode_name(wire: Option<&Value>, path: &str) -> ModelResult<LocalizedText> {
    let map = wire
        .and_then(Value::as_object)
        .ok_or_else(|| ModelError::decode(path, "expected a language map"))?;
    let mut name = LocalizedText::new();
    for (language, value) in map {
        let text = value
            .as_str()
            .ok_or_else(|| ModelError::decode(format!("{path}.{language}"), "expected a string"))?;
        name.insert(language.clone(), text);
    }
    if name.is_empty() {
        return Err(ModelError::decode(path, "name needs at least one translation"));
    }
    Ok(name)
}

fn decode_entity_types(wire: Option<&Value>, path: &str) -> ModelResult<Vec<String>> {
    let items = wire
        .and_then(Value::as_array)
        .ok_or_else(|| ModelError::decode(path, "expected an array of strings"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ModelError::decode(format!("{path}[{i}]"), "expected a string"))
        })
        .collect()
}

fn decode_timestamp(wire: Option<&Value>, path: &str) -> ModelResult<Option<DateTime<Utc>>> {
    match wire {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(|e| ModelError::decode(path, format!("invalid timestamp: {e}"))),
        Some(_) => Err(ModelError::decode(path, "expected an RFC 3339 string")),
    }
}
