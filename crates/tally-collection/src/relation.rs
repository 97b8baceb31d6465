use serde::{Deserialize, Serialize};

use crate::collection::Collection;

/// Where a relation finds its join key on the child side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKey {
    /// Group the child rows by this field's value before lookup.
    Field(String),
    /// The child collection is already keyed by the join value (for
    /// example because it was `group_by`'d upstream); its top-level keys
    /// are used as the lookup index directly, with no re-grouping.
    Indexed,
}

impl From<&str> for ForeignKey {
    fn from(field: &str) -> ForeignKey {
        ForeignKey::Field(field.to_string())
    }
}

impl From<String> for ForeignKey {
    fn from(field: String) -> ForeignKey {
        ForeignKey::Field(field)
    }
}

/// Informational cardinality tag. Lookup always yields whatever the
/// matching bucket contains — zero, one, or many rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    One,
    #[default]
    Many,
}

/// A declarative join: attach the child collection's rows onto a parent
/// collection wherever the child's foreign key equals the parent's
/// `local_key` field.
#[derive(Debug, Clone)]
pub struct Relation {
    pub collection: Collection,
    pub foreign_key: ForeignKey,
    pub local_key: String,
    pub kind: RelationKind,
}
