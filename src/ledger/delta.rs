use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::Ref;

/// Per-relationship outcome of a ledger diff.
///
/// Consumers match exhaustively: a replace supersedes whatever target list
/// the backend currently stores, a patch adjusts it in place.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Delta {
    /// The full, authoritative target set for the relationship. An empty set
    /// means the relationship no longer has any targets.
    Replace(BTreeSet<Ref>),
    /// Additive/subtractive patch: `true` keeps or adds the target, `false`
    /// drops it. Targets the operation never mentioned are untouched.
    Patch(BTreeMap<Ref, bool>),
}
