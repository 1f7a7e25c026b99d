//! Data-driven descriptors of the flat resources the engine manages.

use crate::fields::FieldMap;
use crate::policy::{FieldPolicy, FieldShape, FieldSpec, PolicyTable};
use crate::validate::{check_companions, check_date_range, Companions, DateRange};
use crate::SyncResult;

/// Everything the engine needs to know about one resource kind.
#[derive(Debug, Clone, Copy)]
pub struct ResourceDescriptor {
    /// Collection path segment under the tenant, e.g. `shipping-zones`.
    pub collection: &'static str,
    pub table: PolicyTable,
    /// Boolean field marking the collection's single default member.
    /// Collections with one are serialized per tenant.
    pub default_field: Option<&'static str>,
    pub date_ranges: &'static [DateRange],
    pub companions: &'static [Companions],
}

impl ResourceDescriptor {
    /// Whether operations on this collection take the tenant lock.
    pub fn is_guarded(&self) -> bool {
        self.default_field.is_some()
    }

    /// Runs the pre-request checks on desired configuration.
    pub fn validate(&self, desired: &FieldMap) -> SyncResult<()> {
        for range in self.date_ranges {
            check_date_range(desired, range)?;
        }
        for rule in self.companions {
            check_companions(desired, rule)?;
        }
        Ok(())
    }
}

const SHIPPING_ZONE_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("key"),
    FieldSpec::scalar("name"),
    FieldSpec::new(
        "description",
        FieldPolicy::PreserveIfUserSupplied,
        FieldShape::Localized,
    ),
    FieldSpec::set("locations"),
];

pub const SHIPPING_ZONE: ResourceDescriptor = ResourceDescriptor {
    collection: "shipping-zones",
    table: PolicyTable::new(SHIPPING_ZONE_FIELDS),
    default_field: None,
    date_ranges: &[],
    companions: &[],
};

const SHIPPING_METHOD_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("key"),
    FieldSpec::scalar("name"),
    FieldSpec::new(
        "localizedDescription",
        FieldPolicy::PreserveUnlessUserChanged,
        FieldShape::Localized,
    ),
    FieldSpec::new(
        "taxCategory",
        FieldPolicy::PreserveIfUserSupplied,
        FieldShape::Compound,
    ),
    FieldSpec::new(
        "freeAbove",
        FieldPolicy::PreserveIfUserSupplied,
        FieldShape::Compound,
    ),
    FieldSpec::scalar("isDefault"),
    FieldSpec::scalar("validFrom"),
    FieldSpec::scalar("validUntil"),
    FieldSpec::set("targetCountries"),
    FieldSpec::extension("zoneRates", "zone-rates", "zone"),
];

const SHIPPING_METHOD_DATES: &[DateRange] = &[DateRange {
    from: "validFrom",
    until: "validUntil",
}];

const SHIPPING_METHOD_COMPANIONS: &[Companions] = &[Companions {
    field: "freeAbove",
    requires: &["centAmount", "currencyCode"],
}];

pub const SHIPPING_METHOD: ResourceDescriptor = ResourceDescriptor {
    collection: "shipping-methods",
    table: PolicyTable::new(SHIPPING_METHOD_FIELDS),
    default_field: Some("isDefault"),
    date_ranges: SHIPPING_METHOD_DATES,
    companions: SHIPPING_METHOD_COMPANIONS,
};

const SCHEMA_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("name", FieldPolicy::Authoritative, FieldShape::Localized),
    FieldSpec::set("entityTypes"),
    FieldSpec::scalar("attributes"),
];

/// Schema documents are merged through the same machinery as flat
/// resources, over their wire form.
pub const SCHEMA_TABLE: PolicyTable = PolicyTable::new(SCHEMA_FIELDS);
