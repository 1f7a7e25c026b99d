//! Attribute-definition trees and their type tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use storeconf_types::LocalizedText;

use crate::ModelError;

/// A node of an attribute-definition tree.
///
/// OBJECT nodes nest further `AttributeDefinition`s without any depth limit;
/// the wire format imposes none either. Serde goes through [`crate::codec`],
/// so serializing an `AttributeDefinition` yields the service's wire node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub struct AttributeDefinition {
    /// Unique among siblings.
    pub key: String,
    /// At least one translation.
    pub name: LocalizedText,
    pub description: Option<LocalizedText>,
    pub metadata: AttributeMetadata,
    pub kind: AttributeKind,
}

impl AttributeDefinition {
    /// Creates a node with default (all `false`) metadata and no description.
    pub fn new(key: impl Into<String>, name: LocalizedText, kind: AttributeKind) -> Self {
        Self {
            key: key.into(),
            name,
            description: None,
            metadata: AttributeMetadata::default(),
            kind,
        }
    }

    /// Shorthand for a scalar node with an English name.
    pub fn scalar(key: &str, name: &str, attribute_type: AttributeType) -> Self {
        let kind = match attribute_type {
            AttributeType::Text => AttributeKind::Text,
            AttributeType::Number => AttributeKind::Number,
            AttributeType::Decimal => AttributeKind::Decimal,
            AttributeType::Boolean => AttributeKind::Boolean,
            AttributeType::Date => AttributeKind::Date,
            AttributeType::Time => AttributeKind::Time,
            AttributeType::DateTime => AttributeKind::DateTime,
            AttributeType::Enum => AttributeKind::Enum { values: Vec::new() },
            AttributeType::Reference => AttributeKind::Reference { values: Vec::new() },
            AttributeType::Object => AttributeKind::Object {
                attributes: Vec::new(),
            },
            AttributeType::Array => AttributeKind::Array(ArraySpec::of(AttributeType::Text)),
        };
        Self::new(key, LocalizedText::single("en", name), kind)
    }

    /// Shorthand for an OBJECT node with an English name.
    pub fn object(key: &str, name: &str, attributes: Vec<AttributeDefinition>) -> Self {
        Self::new(
            key,
            LocalizedText::single("en", name),
            AttributeKind::Object { attributes },
        )
    }

    /// Shorthand for an ENUM node with an English name.
    pub fn enumeration(key: &str, name: &str, values: &[&str]) -> Self {
        Self::new(
            key,
            LocalizedText::single("en", name),
            AttributeKind::Enum {
                values: values.iter().map(|v| v.to_string()).collect(),
            },
        )
    }

    /// Shorthand for an ARRAY node with an English name.
    pub fn array(key: &str, name: &str, spec: ArraySpec) -> Self {
        Self::new(key, LocalizedText::single("en", name), AttributeKind::Array(spec))
    }

    #[must_use]
    pub fn with_description(mut self, description: LocalizedText) -> Self {
        self.description = Some(description);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: AttributeMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The declared type, derived from the populated variant.
    pub fn attribute_type(&self) -> AttributeType {
        self.kind.attribute_type()
    }

    /// Allowed values for ENUM and REFERENCE nodes.
    pub fn allowed_values(&self) -> Option<&[String]> {
        match &self.kind {
            AttributeKind::Enum { values } | AttributeKind::Reference { values } => Some(values),
            _ => None,
        }
    }

    /// Nested children for OBJECT nodes; empty for every other type.
    pub fn children(&self) -> &[AttributeDefinition] {
        match &self.kind {
            AttributeKind::Object { attributes } => attributes,
            _ => &[],
        }
    }

    /// Element spec for ARRAY nodes.
    pub fn array_spec(&self) -> Option<&ArraySpec> {
        match &self.kind {
            AttributeKind::Array(spec) => Some(spec),
            _ => None,
        }
    }

    /// Number of levels in this subtree, counting this node as 1.
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(AttributeDefinition::depth)
            .max()
            .unwrap_or(0)
    }

    /// Looks up a descendant by its chain of keys.
    pub fn find(&self, path: &[&str]) -> Option<&AttributeDefinition> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self
                .children()
                .iter()
                .find(|child| child.key == *head)
                .and_then(|child| child.find(rest)),
        }
    }
}

/// Type-specific payload of an attribute node.
///
/// Each variant carries exactly the data its type allows, so "allowed values
/// only for ENUM/REFERENCE, children only for OBJECT, element spec only for
/// ARRAY" holds by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    Text,
    Number,
    Decimal,
    Boolean,
    Date,
    Time,
    DateTime,
    /// Ordered, unique allowed values. Empty is legal.
    Enum { values: Vec<String> },
    /// Ordered, unique allowed reference targets. Empty is legal.
    Reference { values: Vec<String> },
    Array(ArraySpec),
    Object { attributes: Vec<AttributeDefinition> },
}

impl AttributeKind {
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            Self::Text => AttributeType::Text,
            Self::Number => AttributeType::Number,
            Self::Decimal => AttributeType::Decimal,
            Self::Boolean => AttributeType::Boolean,
            Self::Date => AttributeType::Date,
            Self::Time => AttributeType::Time,
            Self::DateTime => AttributeType::DateTime,
            Self::Enum { .. } => AttributeType::Enum,
            Self::Reference { .. } => AttributeType::Reference,
            Self::Array(_) => AttributeType::Array,
            Self::Object { .. } => AttributeType::Object,
        }
    }
}

/// Element description of an ARRAY node.
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySpec {
    pub element_type: AttributeType,
    /// `None` when the wire node omits the flag.
    pub localized: Option<bool>,
    /// Only meaningful for ENUM and REFERENCE elements. `None` means absent,
    /// `Some(vec![])` means present and empty.
    pub values: Option<Vec<String>>,
}

impl ArraySpec {
    /// Array of `element_type` with no optional parts.
    pub fn of(element_type: AttributeType) -> Self {
        Self {
            element_type,
            localized: None,
            values: None,
        }
    }

    /// Array of ENUM elements restricted to `values`.
    pub fn of_enum(values: &[&str]) -> Self {
        Self {
            element_type: AttributeType::Enum,
            localized: None,
            values: Some(values.iter().map(|v| v.to_string()).collect()),
        }
    }
}

/// The closed set of attribute types understood by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeType {
    Text,
    Number,
    Decimal,
    Boolean,
    Date,
    Time,
    DateTime,
    Enum,
    Array,
    Object,
    Reference,
}

impl AttributeType {
    pub const ALL: [AttributeType; 11] = [
        Self::Text,
        Self::Number,
        Self::Decimal,
        Self::Boolean,
        Self::Date,
        Self::Time,
        Self::DateTime,
        Self::Enum,
        Self::Array,
        Self::Object,
        Self::Reference,
    ];

    /// Wire spelling, e.g. `DATE_TIME`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Number => "NUMBER",
            Self::Decimal => "DECIMAL",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::DateTime => "DATE_TIME",
            Self::Enum => "ENUM",
            Self::Array => "ARRAY",
            Self::Object => "OBJECT",
            Self::Reference => "REFERENCE",
        }
    }

    /// Whether nodes of this type carry an allowed-values list.
    pub fn has_allowed_values(&self) -> bool {
        matches!(self, Self::Enum | Self::Reference)
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ModelError::decode("type", format!("unknown attribute type {s:?}")))
    }
}

/// Mandatory metadata flags of every attribute node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeMetadata {
    pub read_only: bool,
    pub localized: bool,
    pub required: bool,
    pub nullable: bool,
}
