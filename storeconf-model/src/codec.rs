//! Attribute tree codec.
//!
//! Converts [`AttributeDefinition`] trees to and from the service's wire JSON:
//!
//! ```text
//! {
//!   "key": "size",
//!   "name": {"en": "Size"},
//!   "description": {"en": "..."},          // optional
//!   "type": "ENUM",
//!   "metadata": {"readOnly": false, "localized": false, "required": true, "nullable": false},
//!   "values": [{"value": "S"}, {"value": "M"}],   // ENUM / REFERENCE only
//!   "attributes": [ ...nodes... ],                 // OBJECT only
//!   "arrayType": {"type": "ENUM", "localized": false, "values": [...]}  // ARRAY only
//! }
//! ```
//!
//! Decoding is strict: a node whose type lacks its variant field, or carries
//! a field its type forbids, is rejected with the JSON path of the node.
//! A JSON `null` in an optional slot is read as absent. Encoding emits only
//! the fields that apply to the node's type, so for any valid wire tree `w`,
//! `encode(&decode(&w)?) == w`.

use serde_json::{Map, Value};
use std::collections::HashSet;
use storeconf_types::LocalizedText;

use crate::attribute::{ArraySpec, AttributeDefinition, AttributeKind, AttributeMetadata, AttributeType};
use crate::{ModelError, ModelResult};

const KEY: &str = "key";
const NAME: &str = "name";
const DESCRIPTION: &str = "description";
const TYPE: &str = "type";
const METADATA: &str = "metadata";
const VALUES: &str = "values";
const ATTRIBUTES: &str = "attributes";
const ARRAY_TYPE: &str = "arrayType";
const LOCALIZED: &str = "localized";
const VALUE: &str = "value";

// ── Encode ───────────────────────────────────────────────────────

/// Encodes one attribute node (and its subtree) as a wire node.
pub fn encode(attribute: &AttributeDefinition) -> Value {
    let mut node = Map::new();
    node.insert(KEY.into(), Value::String(attribute.key.clone()));
    node.insert(NAME.into(), attribute.name.to_json());
    if let Some(description) = &attribute.description {
        node.insert(DESCRIPTION.into(), description.to_json());
    }
    node.insert(
        TYPE.into(),
        Value::String(attribute.attribute_type().as_str().to_string()),
    );
    node.insert(METADATA.into(), encode_metadata(&attribute.metadata));

    match &attribute.kind {
        AttributeKind::Enum { values } | AttributeKind::Reference { values } => {
            node.insert(VALUES.into(), encode_values(values));
        }
        AttributeKind::Object { attributes } => {
            node.insert(ATTRIBUTES.into(), encode_all(attributes));
        }
        AttributeKind::Array(spec) => {
            node.insert(ARRAY_TYPE.into(), encode_array_spec(spec));
        }
        _ => {}
    }

    Value::Object(node)
}

/// Encodes an ordered list of sibling nodes.
pub fn encode_all(attributes: &[AttributeDefinition]) -> Value {
    Value::Array(attributes.iter().map(encode).collect())
}

fn encode_metadata(metadata: &AttributeMetadata) -> Value {
    let mut map = Map::new();
    map.insert("readOnly".into(), Value::Bool(metadata.read_only));
    map.insert("localized".into(), Value::Bool(metadata.localized));
    map.insert("required".into(), Value::Bool(metadata.required));
    map.insert("nullable".into(), Value::Bool(metadata.nullable));
    Value::Object(map)
}

fn encode_values(values: &[String]) -> Value {
    Value::Array(
        values
            .iter()
            .map(|v| {
                let mut entry = Map::new();
                entry.insert(VALUE.into(), Value::String(v.clone()));
                Value::Object(entry)
            })
            .collect(),
    )
}

fn encode_array_spec(spec: &ArraySpec) -> Value {
    let mut map = Map::new();
    map.insert(
        TYPE.into(),
        Value::String(spec.element_type.as_str().to_string()),
    );
    if let Some(localized) = spec.localized {
        map.insert(LOCALIZED.into(), Value::Bool(localized));
    }
    if let Some(values) = &spec.values {
        map.insert(VALUES.into(), encode_values(values));
    }
    Value::Object(map)
}

// ── Decode ───────────────────────────────────────────────────────

/// Decodes one wire node (and its subtree).
pub fn decode(wire: &Value) -> ModelResult<AttributeDefinition> {
    decode_node(wire, "attribute")
}

/// Decodes a wire array of sibling nodes, checking key uniqueness.
pub fn decode_all(wire: &Value) -> ModelResult<Vec<AttributeDefinition>> {
    decode_list(wire, ATTRIBUTES)
}

fn decode_list(wire: &Value, path: &str) -> ModelResult<Vec<AttributeDefinition>> {
    let items = wire
        .as_array()
        .ok_or_else(|| ModelError::decode(path, "expected an array of attribute nodes"))?;

    let mut seen = HashSet::new();
    let mut nodes = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{path}[{i}]");
        let node = decode_node(item, &item_path)?;
        if !seen.insert(node.key.clone()) {
            return Err(ModelError::decode(
                item_path,
                format!("duplicate sibling key {:?}", node.key),
            ));
        }
        nodes.push(node);
    }
    Ok(nodes)
}

fn decode_node(wire: &Value, path: &str) -> ModelResult<AttributeDefinition> {
    let node = wire
        .as_object()
        .ok_or_else(|| ModelError::decode(path, "expected an attribute object"))?;

    let key = required(node, KEY, path)?
        .as_str()
        .ok_or_else(|| ModelError::decode(field_path(path, KEY), "expected a string"))?;
    if key.is_empty() {
        return Err(ModelError::decode(field_path(path, KEY), "key is empty"));
    }

    let name = decode_text(required(node, NAME, path)?, &field_path(path, NAME))?;
    if name.is_empty() {
        return Err(ModelError::decode(
            field_path(path, NAME),
            "name needs at least one translation",
        ));
    }
    let description = optional(node, DESCRIPTION)
        .map(|v| decode_text(v, &field_path(path, DESCRIPTION)))
        .transpose()?;

    let attribute_type = decode_type(required(node, TYPE, path)?, &field_path(path, TYPE))?;
    let metadata = decode_metadata(required(node, METADATA, path)?, &field_path(path, METADATA))?;

    let values = optional(node, VALUES);
    let children = optional(node, ATTRIBUTES);
    let array_type = optional(node, ARRAY_TYPE);

    // Every variant field other than the one selected by `type` must be absent.
    let forbid = |present: Option<&Value>, field: &str| -> ModelResult<()> {
        match present {
            Some(_) => Err(ModelError::decode(
                field_path(path, field),
                format!("`{field}` is not allowed for type {attribute_type}"),
            )),
            None => Ok(()),
        }
    };
    let require = |present: Option<&Value>, field: &str| -> ModelResult<()> {
        match present {
            Some(_) => Ok(()),
            None => Err(ModelError::decode(
                path,
                format!("type {attribute_type} requires `{field}`"),
            )),
        }
    };

    let kind = match attribute_type {
        AttributeType::Enum | AttributeType::Reference => {
            require(values, VALUES)?;
            forbid(children, ATTRIBUTES)?;
            forbid(array_type, ARRAY_TYPE)?;
            let values = decode_values(values.unwrap_or(&Value::Null), &field_path(path, VALUES))?;
            if attribute_type == AttributeType::Enum {
                AttributeKind::Enum { values }
            } else {
                AttributeKind::Reference { values }
            }
        }
        AttributeType::Object => {
            require(children, ATTRIBUTES)?;
            forbid(values, VALUES)?;
            forbid(array_type, ARRAY_TYPE)?;
            let attributes =
                decode_list(children.unwrap_or(&Value::Null), &field_path(path, ATTRIBUTES))?;
            AttributeKind::Object { attributes }
        }
        AttributeType::Array => {
            require(array_type, ARRAY_TYPE)?;
            forbid(values, VALUES)?;
            forbid(children, ATTRIBUTES)?;
            AttributeKind::Array(decode_array_spec(
                array_type.unwrap_or(&Value::Null),
                &field_path(path, ARRAY_TYPE),
            )?)
        }
        scalar => {
            forbid(values, VALUES)?;
            forbid(children, ATTRIBUTES)?;
            forbid(array_type, ARRAY_TYPE)?;
            scalar_kind(scalar)
        }
    };

    Ok(AttributeDefinition {
        key: key.to_string(),
        name,
        description,
        metadata,
        kind,
    })
}

fn scalar_kind(attribute_type: AttributeType) -> AttributeKind {
    match attribute_type {
        AttributeType::Number => AttributeKind::Number,
        AttributeType::Decimal => AttributeKind::Decimal,
        AttributeType::Boolean => AttributeKind::Boolean,
        AttributeType::Date => AttributeKind::Date,
        AttributeType::Time => AttributeKind::Time,
        AttributeType::DateTime => AttributeKind::DateTime,
        _ => AttributeKind::Text,
    }
}

fn decode_type(wire: &Value, path: &str) -> ModelResult<AttributeType> {
    let raw = wire
        .as_str()
        .ok_or_else(|| ModelError::decode(path, "expected a type string"))?;
    raw.parse::<AttributeType>().map_err(|e| match e {
        ModelError::Decode { reason, .. } => ModelError::decode(path, reason),
        other => other,
    })
}

fn decode_metadata(wire: &Value, path: &str) -> ModelResult<AttributeMetadata> {
    let map = wire
        .as_object()
        .ok_or_else(|| ModelError::decode(path, "expected a metadata object"))?;
    let flag = |name: &str| -> ModelResult<bool> {
        map.get(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| ModelError::decode(field_path(path, name), "expected a boolean"))
    };
    Ok(AttributeMetadata {
        read_only: flag("readOnly")?,
        localized: flag("localized")?,
        required: flag("required")?,
        nullable: flag("nullable")?,
    })
}

fn decode_text(wire: &Value, path: &str) -> ModelResult<LocalizedText> {
    let map = wire
        .as_object()
        .ok_or_else(|| ModelError::decode(path, "expected a language map"))?;
    let mut text = LocalizedText::new();
    for (language, value) in map {
        let s = value.as_str().ok_or_else(|| {
            ModelError::decode(field_path(path, language), "expected a string translation")
        })?;
        text.insert(language.clone(), s);
    }
    Ok(text)
}

fn decode_values(wire: &Value, path: &str) -> ModelResult<Vec<String>> {
    let items = wire
        .as_array()
        .ok_or_else(|| ModelError::decode(path, "expected an array of values"))?;
    let mut seen = HashSet::new();
    let mut values = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let value = item
            .get(VALUE)
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::decode(format!("{path}[{i}]"), "expected {\"value\": string}"))?;
        if !seen.insert(value) {
            return Err(ModelError::decode(
                format!("{path}[{i}]"),
                format!("duplicate allowed value {value:?}"),
            ));
        }
        values.push(value.to_string());
    }
    Ok(values)
}

fn decode_array_spec(wire: &Value, path: &str) -> ModelResult<ArraySpec> {
    let map = wire
        .as_object()
        .ok_or_else(|| ModelError::decode(path, "expected an arrayType object"))?;
    let element_type = decode_type(
        map.get(TYPE)
            .ok_or_else(|| ModelError::decode(path, "missing required field `type`"))?,
        &field_path(path, TYPE),
    )?;
    let localized = match map.get(LOCALIZED) {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_bool()
                .ok_or_else(|| ModelError::decode(field_path(path, LOCALIZED), "expected a boolean"))?,
        ),
    };
    let values = match map.get(VALUES) {
        None | Some(Value::Null) => None,
        Some(v) => {
            if !element_type.has_allowed_values() {
                return Err(ModelError::decode(
                    field_path(path, VALUES),
                    format!("`values` is not allowed for element type {element_type}"),
                ));
            }
            Some(decode_values(v, &field_path(path, VALUES))?)
        }
    };
    Ok(ArraySpec {
        element_type,
        localized,
        values,
    })
}

fn required<'a>(node: &'a Map<String, Value>, field: &str, path: &str) -> ModelResult<&'a Value> {
    optional(node, field)
        .ok_or_else(|| ModelError::decode(path, format!("missing required field `{field}`")))
}

fn optional<'a>(node: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    node.get(field).filter(|v| !v.is_null())
}

fn field_path(path: &str, field: &str) -> String {
    format!("{path}.{field}")
}

// ── Validation ───────────────────────────────────────────────────

/// Checks a configured tree against the data-model invariants before it is
/// sent: non-empty keys and names, unique sibling keys, unique allowed
/// values, and element values only on ENUM/REFERENCE arrays.
pub fn validate_attributes(attributes: &[AttributeDefinition]) -> ModelResult<()> {
    validate_siblings(attributes, ATTRIBUTES)
}

fn validate_siblings(attributes: &[AttributeDefinition], path: &str) -> ModelResult<()> {
    let mut seen = HashSet::new();
    for (i, attribute) in attributes.iter().enumerate() {
        let node_path = format!("{path}[{i}]");
        if !seen.insert(attribute.key.as_str()) {
            return Err(ModelError::invariant(
                node_path,
                format!("duplicate sibling key {:?}", attribute.key),
            ));
        }
        validate_node(attribute, &node_path)?;
    }
    Ok(())
}

fn validate_node(attribute: &AttributeDefinition, path: &str) -> ModelResult<()> {
    if attribute.key.is_empty() {
        return Err(ModelError::invariant(path, "key is empty"));
    }
    if attribute.name.is_empty() {
        return Err(ModelError::invariant(path, "name needs at least one translation"));
    }
    match &attribute.kind {
        AttributeKind::Enum { values } | AttributeKind::Reference { values } => {
            ensure_unique(values, &field_path(path, VALUES))
        }
        AttributeKind::Object { attributes } => {
            validate_siblings(attributes, &field_path(path, ATTRIBUTES))
        }
        AttributeKind::Array(spec) => match &spec.values {
            Some(_) if !spec.element_type.has_allowed_values() => Err(ModelError::invariant(
                field_path(path, ARRAY_TYPE),
                format!("`values` is not allowed for element type {}", spec.element_type),
            )),
            Some(values) => ensure_unique(values, &field_path(path, ARRAY_TYPE)),
            None => Ok(()),
        },
        _ => Ok(()),
    }
}

fn ensure_unique(values: &[String], path: &str) -> ModelResult<()> {
    let mut seen = HashSet::new();
    match values.iter().find(|v| !seen.insert(v.as_str())) {
        Some(duplicate) => Err(ModelError::invariant(
            path,
            format!("duplicate allowed value {duplicate:?}"),
        )),
        None => Ok(()),
    }
}

// ── Serde bridge ─────────────────────────────────────────────────

impl TryFrom<Value> for AttributeDefinition {
    type Error = ModelError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        decode(&value)
    }
}

impl From<AttributeDefinition> for Value {
    fn from(attribute: AttributeDefinition) -> Self {
        encode(&attribute)
    }
}
