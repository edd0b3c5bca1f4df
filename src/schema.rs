//! Schema seam: the relationship facts the reconciler consults.

use rustc_hash::{FxHashMap, FxHashSet};

/// Answers relationship questions for resource types.
///
/// This is the only schema knowledge the crate needs; everything else a
/// schema compiler produces (attribute types, constraints, defaults) is
/// consumed elsewhere in the surrounding system.
pub trait RelationshipSchema {
    /// The inverse relationship name declared on the target type of
    /// `relationship`, if any.
    fn inverse_of(&self, ty: &str, relationship: &str) -> Option<&str>;

    /// Whether `relationship` on `ty` is single-valued.
    fn is_to_one(&self, _ty: &str, _relationship: &str) -> bool {
        false
    }
}

impl<S: RelationshipSchema + ?Sized> RelationshipSchema for &S {
    fn inverse_of(&self, ty: &str, relationship: &str) -> Option<&str> {
        (**self).inverse_of(ty, relationship)
    }

    fn is_to_one(&self, ty: &str, relationship: &str) -> bool {
        (**self).is_to_one(ty, relationship)
    }
}

/// In-memory [`RelationshipSchema`] for embedders and tests.
#[derive(Clone, Debug, Default)]
pub struct InverseMap {
    inverses: FxHashMap<String, FxHashMap<String, String>>,
    to_one: FxHashMap<String, FxHashSet<String>>,
}

impl InverseMap {
    /// Creates an empty schema: every relationship is inverse-less and
    /// many-valued until declared otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `relationship` on `ty` with `inverse` on the target type
    /// `target_ty`, registering both directions.
    pub fn relate(mut self, ty: &str, relationship: &str, target_ty: &str, inverse: &str) -> Self {
        self.inverses
            .entry(ty.to_string())
            .or_default()
            .insert(relationship.to_string(), inverse.to_string());
        self.inverses
            .entry(target_ty.to_string())
            .or_default()
            .insert(inverse.to_string(), relationship.to_string());
        self
    }

    /// Marks `relationship` on `ty` as single-valued.
    pub fn to_one(mut self, ty: &str, relationship: &str) -> Self {
        self.to_one
            .entry(ty.to_string())
            .or_default()
            .insert(relationship.to_string());
        self
    }
}

impl RelationshipSchema for InverseMap {
    fn inverse_of(&self, ty: &str, relationship: &str) -> Option<&str> {
        self.inverses
            .get(ty)
            .and_then(|rels| rels.get(relationship))
            .map(String::as_str)
    }

    fn is_to_one(&self, ty: &str, relationship: &str) -> bool {
        self.to_one
            .get(ty)
            .is_some_and(|rels| rels.contains(relationship))
    }
}
