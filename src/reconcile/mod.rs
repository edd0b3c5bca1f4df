//! Schema-aware relationship reconciliation over a mutation ledger.
//!
//! A [`Reconciler`] drives one [`MutationLedger`] for a single write
//! operation. For every relationship present on an asserted resource it
//! declares the complete forward arrow group and keeps the declared inverse
//! relationship in sync: inverse arrows are asserted for every current
//! target and retracted for every target the operation removed.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::{ConflictError, ReconcileError, ReconcileResult};
use crate::ledger::{Delta, MutationLedger};
use crate::model::{Arrow, Node, Ref, Resource};
use crate::schema::RelationshipSchema;


/// Drives one mutation ledger for a single write operation, keeping forward
/// relationships and their declared inverses consistent.
///
/// The contract is strictly phased: issue every
/// [`assert_resource`](Self::assert_resource) /
/// [`retract_resource`](Self::retract_resource) call before reading
/// [`get_resources`](Self::get_resources) or
/// [`get_relationship_changes`](Self::get_relationship_changes). Reading
/// before all write-intent calls are issued yields an incomplete diff; this
/// is a precondition, not a runtime check.
#[derive(Debug)]
pub struct Reconciler<S> {
    schema: S,
    ledger: MutationLedger,
    explicit: FxHashSet<Ref>,
}

impl<S: RelationshipSchema> Reconciler<S> {
    /// Creates a reconciler for one write operation.
    pub fn new(schema: S) -> Self {
        Self {
            schema,
            ledger: MutationLedger::new(),
            explicit: FxHashSet::default(),
        }
    }

    /// Asserts `updated` and reconciles every relationship present on it
    /// against `existing`, the caller's view of the stored resource.
    ///
    /// Relationships absent from `updated` are left untouched. `existing` is
    /// only consulted to find targets the operation removed, so passing
    /// `None` treats every relationship on `updated` as new.
    pub fn assert_resource(
        &mut self,
        updated: &Resource,
        existing: Option<&Resource>,
    ) -> ReconcileResult<()> {
        self.ledger.assert_node(Node {
            key: updated.key.clone(),
            props: updated.props.clone(),
        })?;
        self.explicit.insert(updated.key.clone());

        for (rel, new_targets) in &updated.relationships {
            let old_targets: &[Ref] = existing
                .and_then(|e| e.relationships.get(rel))
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let new_set: FxHashSet<&Ref> = new_targets.iter().collect();
            let removed: Vec<&Ref> = old_targets
                .iter()
                .filter(|t| !new_set.contains(*t))
                .collect();

            self.ledger
                .assert_arrow_group(&updated.key, new_targets, rel)?;
            self.check_to_one(&updated.key, rel)?;

            if let Some(inverse) = self.schema.inverse_of(&updated.key.ty, rel) {
                for target in new_targets {
                    self.ledger.assert_arrow(Arrow::new(
                        target.clone(),
                        updated.key.clone(),
                        inverse,
                    ))?;
                    self.check_to_one(target, inverse)?;
                }
                for target in &removed {
                    self.ledger.retract_arrow(Arrow::new(
                        (*target).clone(),
                        updated.key.clone(),
                        inverse,
                    ))?;
                }
                debug!(
                    key = %updated.key,
                    relationship = %rel,
                    inverse,
                    added = new_targets.len(),
                    removed = removed.len(),
                    "inverse arrows reconciled"
                );
            }
        }
        Ok(())
    }

    /// Retracts a resource the caller knows to exist.
    ///
    /// `existing` is the stored resource being deleted; `None` means the
    /// resource was never known and is a caller error, not a ledger
    /// conflict. Every relationship the resource had is declared empty and
    /// complete, and inverse arrows to it are retracted.
    pub fn retract_resource(
        &mut self,
        key: &Ref,
        existing: Option<&Resource>,
    ) -> ReconcileResult<()> {
        let Some(existing) = existing else {
            return Err(ReconcileError::UnknownResource(key.clone()));
        };

        self.ledger.retract_node(key)?;
        for (rel, targets) in &existing.relationships {
            self.ledger.assert_arrow_group(key, &[], rel)?;
            if let Some(inverse) = self.schema.inverse_of(&key.ty, rel) {
                for target in targets {
                    self.ledger
                        .retract_arrow(Arrow::new(target.clone(), key.clone(), inverse))?;
                }
            }
        }
        debug!(key = %key, "resource retracted");
        Ok(())
    }

    /// Identities passed to [`assert_resource`](Self::assert_resource)
    /// directly, as opposed to being learned as relationship targets.
    ///
    /// Consumers use this to tell "being created or updated now" apart from
    /// "must already exist in the backing store".
    pub fn explicit_resources(&self) -> &FxHashSet<Ref> {
        &self.explicit
    }

    /// Every resource touched by the operation, mapped to its merged
    /// properties, or `None` if retracted.
    pub fn get_resources(&self) -> BTreeMap<Ref, Option<Node>> {
        self.ledger.get_nodes()
    }

    /// The per-relationship diff for `key`.
    pub fn get_relationship_changes(&self, key: &Ref) -> BTreeMap<String, Delta> {
        self.ledger.get_arrow_changes(key)
    }

    fn check_to_one(&self, source: &Ref, label: &str) -> ReconcileResult<()> {
        if !self.schema.is_to_one(&source.ty, label) {
            return Ok(());
        }
        if let Some(asserted) = self.ledger.asserted_targets(source, label) {
            if asserted.len() > 1 {
                let mut targets: Vec<Ref> = asserted.iter().cloned().collect();
                targets.sort();
                return Err(ConflictError::MultipleTargets {
                    group_source: source.clone(),
                    label: label.to_string(),
                    targets,
                }
                .into());
            }
        }
        Ok(())
    }
}
