//! Error types for ledger conflicts and reconciler precondition failures.

use thiserror::Error;

use crate::model::{Arrow, PropValue, Ref};

/// Result type for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, ConflictError>;

/// Result type for reconciler operations.
pub type ReconcileResult<T> = std::result::Result<T, ReconcileError>;

/// A contradiction between mutation requests within one ledger.
///
/// Always fatal to the current write operation: the caller discards the
/// ledger and surfaces the error. Each variant carries the offending node or
/// arrow and the prior state it collided with.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// A node was asserted after being retracted in the same ledger.
    #[error("node {key} was already retracted")]
    NodeRetracted {
        /// Identity of the node.
        key: Ref,
    },

    /// A node was retracted after being asserted in the same ledger.
    #[error("node {key} was already asserted")]
    NodeAsserted {
        /// Identity of the node.
        key: Ref,
    },

    /// Two assertions of one node disagree on a property value.
    #[error("conflicting values for `{prop}` on {key}: {prior} vs {requested}")]
    PropValueMismatch {
        /// Identity of the node.
        key: Ref,
        /// Property name both assertions set.
        prop: String,
        /// Value from the earlier assertion.
        prior: PropValue,
        /// Value from the later assertion.
        requested: PropValue,
    },

    /// An arrow was asserted after being retracted in the same ledger.
    #[error("arrow {arrow} was already retracted")]
    ArrowRetracted {
        /// The conflicting arrow.
        arrow: Arrow,
    },

    /// An arrow was retracted after being asserted in the same ledger.
    #[error("arrow {arrow} was already asserted")]
    ArrowAsserted {
        /// The conflicting arrow.
        arrow: Arrow,
    },

    /// An arrow was asserted or retracted against a group already declared
    /// complete, with a target outside the declared set.
    #[error("arrow {arrow} is not in the declared complete target set")]
    OutsideCompleteGroup {
        /// The offending arrow.
        arrow: Arrow,
    },

    /// A complete group declaration disagrees with the arrows already
    /// asserted for that `(source, label)` group.
    #[error(
        "complete group {group_source}--({label})-->* declared with mismatched targets \
         (missing: [{}], extra: [{}])",
        join_refs(.missing),
        join_refs(.extra)
    )]
    GroupMismatch {
        /// Source of the arrow group.
        group_source: Ref,
        /// Relationship name of the arrow group.
        label: String,
        /// Previously asserted targets absent from the declaration, sorted.
        missing: Vec<Ref>,
        /// Declared targets not previously asserted, sorted.
        extra: Vec<Ref>,
    },

    /// A to-one relationship resolved to more than one live target.
    #[error(
        "to-one relationship {group_source}--({label})-->* resolves to [{}]",
        join_refs(.targets)
    )]
    MultipleTargets {
        /// Source of the arrow group.
        group_source: Ref,
        /// Relationship name of the arrow group.
        label: String,
        /// The live targets, sorted.
        targets: Vec<Ref>,
    },
}

/// Errors surfaced by the reconciler.
///
/// Distinguishes internal contradictions discovered mid-computation
/// ([`ConflictError`]) from caller misuse of the API.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The underlying ledger detected a contradiction.
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// A resource that was never known to exist cannot be retracted.
    #[error("cannot retract unknown resource {0}")]
    UnknownResource(Ref),
}

fn join_refs(refs: &[Ref]) -> String {
    refs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
