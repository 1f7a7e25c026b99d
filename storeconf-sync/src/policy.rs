//! Per-field visibility policies.
//!
//! The remote service does not echo every field back faithfully. Each
//! tracked field of a resource is assigned, once, a [`FieldPolicy`] that
//! tells the merger whose value to trust, and a [`FieldShape`] that tells
//! the merger and the change-set builder how to compare it.

use serde::{Deserialize, Serialize};

/// Whose value wins when desired, previous and actual disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPolicy {
    /// The freshly read value always wins.
    #[default]
    Authoritative,
    /// Unchanged configuration keeps the recorded value even if the service
    /// reports something else (or nothing).
    PreserveUnlessUserChanged,
    /// Undeclared and empty stays absent; declared reflects whether the
    /// service reports a value.
    PreserveIfUserSupplied,
}

/// How a field's value is compared and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldShape {
    #[default]
    Scalar,
    /// Order-insensitive list.
    Set,
    /// Sub-object diffed field by field.
    Compound,
    /// Bare string or language map on the wire.
    Localized,
    /// Member list stored in its own collection under the parent,
    /// identified by `key_field`. Never part of the parent body.
    Extension {
        collection: &'static str,
        key_field: &'static str,
    },
}

impl FieldShape {
    /// Set-valued shapes compare as multisets.
    pub fn is_set(&self) -> bool {
        matches!(self, FieldShape::Set | FieldShape::Extension { .. })
    }
}

/// One row of a [`PolicyTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub policy: FieldPolicy,
    pub shape: FieldShape,
}

impl FieldSpec {
    pub const fn new(name: &'static str, policy: FieldPolicy, shape: FieldShape) -> Self {
        Self {
            name,
            policy,
            shape,
        }
    }

    /// Authoritative scalar.
    pub const fn scalar(name: &'static str) -> Self {
        Self::new(name, FieldPolicy::Authoritative, FieldShape::Scalar)
    }

    /// Authoritative set-valued list.
    pub const fn set(name: &'static str) -> Self {
        Self::new(name, FieldPolicy::Authoritative, FieldShape::Set)
    }

    pub const fn extension(
        name: &'static str,
        collection: &'static str,
        key_field: &'static str,
    ) -> Self {
        Self::new(
            name,
            FieldPolicy::Authoritative,
            FieldShape::Extension {
                collection,
                key_field,
            },
        )
    }
}

/// Static field-to-policy assignment of one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyTable {
    fields: &'static [FieldSpec],
}

/// Fallback for fields no table lists.
const UNLISTED: FieldSpec = FieldSpec::scalar("");

impl PolicyTable {
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn get(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    /// Policy of `name`; unlisted fields are authoritative.
    pub fn policy(&self, name: &str) -> FieldPolicy {
        self.get(name).unwrap_or(&UNLISTED).policy
    }

    /// Shape of `name`; unlisted fields are scalars.
    pub fn shape(&self, name: &str) -> FieldShape {
        self.get(name).unwrap_or(&UNLISTED).shape
    }

    /// Fields stored in their own sub-collections.
    pub fn extensions(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields
            .iter()
            .filter(|spec| matches!(spec.shape, FieldShape::Extension { .. }))
    }

    pub fn is_extension(&self, name: &str) -> bool {
        matches!(self.shape(name), FieldShape::Extension { .. })
    }
}
