//! Schema-agnostic mutation ledger.
//!
//! A [`MutationLedger`] is an unordered collection of node and arrow mutation
//! requests, keyed by identity, for exactly one logical write operation. It
//! detects contradictory requests the moment they are issued and computes a
//! per-relationship diff on read-back. It holds no reference to any backing
//! store and is discarded after the operation, so a conflict at any point
//! simply abandons the whole prospective change set.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::error::{ConflictError, LedgerResult};
use crate::model::{Arrow, Node, PropMap, Ref};

mod delta;
pub use delta::Delta;


/// Lifecycle state of a node within one ledger.
#[derive(Clone, Debug, PartialEq)]
enum NodeState {
    /// Explicitly asserted, with properties merged across assertions.
    Asserted(PropMap),
    /// Explicitly retracted.
    Retracted,
    /// Referenced as an arrow endpoint; no explicit claim made.
    Related,
}

/// Bookkeeping for one `(source, label)` arrow group.
///
/// `seen` is the union of every target mentioned by assert, retract, or mark.
/// It exists only to decide whether anything changed and is never persisted.
#[derive(Debug, Default)]
struct ArrowGroup {
    asserted: FxHashSet<Ref>,
    retracted: FxHashSet<Ref>,
    marked: FxHashSet<Ref>,
    seen: FxHashSet<Ref>,
    complete: bool,
}

/// Unordered collection of node and arrow mutation requests for one logical
/// write operation.
///
/// Construct fresh per operation, mutate through the `assert_*` / `retract_*`
/// / `mark_*` operations, read back via [`get_nodes`](Self::get_nodes) and
/// [`get_arrow_changes`](Self::get_arrow_changes), then drop.
#[derive(Debug, Default)]
pub struct MutationLedger {
    nodes: FxHashMap<Ref, NodeState>,
    groups: FxHashMap<Ref, FxHashMap<String, ArrowGroup>>,
}

impl MutationLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asserts that a node exists with the given properties.
    ///
    /// Properties shallow-merge over any previously asserted properties for
    /// the same key. A re-assertion with an equal value is a no-op; a
    /// differing value is a conflict, never a silent overwrite.
    pub fn assert_node(&mut self, node: Node) -> LedgerResult<()> {
        let Node { key, props } = node;
        match self.nodes.get_mut(&key) {
            Some(NodeState::Retracted) => {
                warn!(key = %key, "assert of a retracted node");
                Err(ConflictError::NodeRetracted { key })
            }
            Some(NodeState::Asserted(existing)) => {
                for (prop, value) in &props {
                    if let Some(prior) = existing.get(prop) {
                        if prior != value {
                            return Err(ConflictError::PropValueMismatch {
                                key: key.clone(),
                                prop: prop.clone(),
                                prior: prior.clone(),
                                requested: value.clone(),
                            });
                        }
                    }
                }
                existing.extend(props);
                Ok(())
            }
            Some(state @ NodeState::Related) => {
                *state = NodeState::Asserted(props);
                Ok(())
            }
            None => {
                self.nodes.insert(key, NodeState::Asserted(props));
                Ok(())
            }
        }
    }

    /// Retracts a node.
    ///
    /// Does not check for live arrows referencing the node; relationship
    /// cleanup is the caller's responsibility.
    pub fn retract_node(&mut self, key: &Ref) -> LedgerResult<()> {
        match self.nodes.get_mut(key) {
            Some(NodeState::Asserted(_)) => {
                warn!(key = %key, "retract of an asserted node");
                Err(ConflictError::NodeAsserted { key: key.clone() })
            }
            Some(state) => {
                *state = NodeState::Retracted;
                Ok(())
            }
            None => {
                self.nodes.insert(key.clone(), NodeState::Retracted);
                Ok(())
            }
        }
    }

    /// Registers a node touched only as an arrow endpoint.
    ///
    /// Inserts the key as related only if absent; never overwrites an
    /// existing state.
    pub fn relate_node(&mut self, key: &Ref) {
        self.nodes
            .entry(key.clone())
            .or_insert(NodeState::Related);
    }

    /// Asserts one relationship instance.
    ///
    /// Both endpoints are registered via [`assert_node`](Self::assert_node)
    /// with no properties, so every arrow endpoint appears in the node set
    /// even if never asserted explicitly.
    pub fn assert_arrow(&mut self, arrow: Arrow) -> LedgerResult<()> {
        if let Some(group) = self.group(&arrow.source, &arrow.label) {
            if group.retracted.contains(&arrow.target) {
                return Err(ConflictError::ArrowRetracted { arrow });
            }
            if group.complete && !group.asserted.contains(&arrow.target) {
                warn!(arrow = %arrow, "assert outside a complete group");
                return Err(ConflictError::OutsideCompleteGroup { arrow });
            }
        }
        let Arrow { source, target, label } = arrow;
        self.assert_node(Node::new(source.clone()))?;
        self.assert_node(Node::new(target.clone()))?;
        let group = self.group_mut(&source, &label);
        group.seen.insert(target.clone());
        group.asserted.insert(target);
        Ok(())
    }

    /// Retracts one relationship instance.
    ///
    /// Does not register the endpoints.
    pub fn retract_arrow(&mut self, arrow: Arrow) -> LedgerResult<()> {
        if let Some(group) = self.group(&arrow.source, &arrow.label) {
            if group.asserted.contains(&arrow.target) {
                return Err(ConflictError::ArrowAsserted { arrow });
            }
            if group.complete {
                // Not asserted (checked above), so the target is outside the
                // declared set.
                warn!(arrow = %arrow, "retract outside a complete group");
                return Err(ConflictError::OutsideCompleteGroup { arrow });
            }
        }
        let Arrow { source, target, label } = arrow;
        let group = self.group_mut(&source, &label);
        group.seen.insert(target.clone());
        group.retracted.insert(target);
        Ok(())
    }

    /// Records an arrow as pre-existing state without claiming anything
    /// about the new state.
    ///
    /// Registers the source as related and adds the target to the group's
    /// seen set only.
    pub fn mark_arrow(&mut self, arrow: Arrow) {
        self.relate_node(&arrow.source);
        let Arrow { source, target, label } = arrow;
        let group = self.group_mut(&source, &label);
        group.seen.insert(target.clone());
        group.marked.insert(target);
    }

    /// Declares the full, authoritative target set for `(source, label)`.
    ///
    /// Completeness is sticky: once declared, every later assert or retract
    /// in the group must stay within the declared set, and a re-declaration
    /// must name exactly the same targets.
    pub fn assert_arrow_group(
        &mut self,
        source: &Ref,
        targets: &[Ref],
        label: &str,
    ) -> LedgerResult<()> {
        if let Some(group) = self.group(source, label) {
            if group.complete {
                let requested: FxHashSet<&Ref> = targets.iter().collect();
                let mut missing: Vec<Ref> = group
                    .asserted
                    .iter()
                    .filter(|t| !requested.contains(*t))
                    .cloned()
                    .collect();
                let mut extra: Vec<Ref> = targets
                    .iter()
                    .filter(|t| !group.asserted.contains(*t))
                    .cloned()
                    .collect();
                if missing.is_empty() && extra.is_empty() {
                    return Ok(());
                }
                missing.sort();
                extra.sort();
                extra.dedup();
                warn!(
                    source = %source,
                    label,
                    "complete group re-declared with different targets"
                );
                return Err(ConflictError::GroupMismatch {
                    group_source: source.clone(),
                    label: label.to_string(),
                    missing,
                    extra,
                });
            }
        }
        for target in targets {
            self.assert_arrow(Arrow::new(source.clone(), target.clone(), label))?;
        }
        // Full membership comparison, not a size check: an individual
        // assertion that slipped in before this declaration must not survive
        // completion unnoticed.
        let group = self.group_mut(source, label);
        let requested: FxHashSet<&Ref> = targets.iter().collect();
        let mut extra: Vec<Ref> = group
            .asserted
            .iter()
            .filter(|t| !requested.contains(*t))
            .cloned()
            .collect();
        if !extra.is_empty() {
            extra.sort();
            warn!(source = %source, label, "arrows asserted outside the declared set");
            return Err(ConflictError::GroupMismatch {
                group_source: source.clone(),
                label: label.to_string(),
                missing: Vec::new(),
                extra,
            });
        }
        group.complete = true;
        debug!(source = %source, label, targets = targets.len(), "arrow group complete");
        Ok(())
    }

    /// Computes the per-relationship diff for `source`.
    ///
    /// Labels whose asserted set exactly reproduces the marked pre-existing
    /// state with nothing retracted are suppressed as no-ops. Complete
    /// groups yield [`Delta::Replace`]; everything else yields
    /// [`Delta::Patch`].
    pub fn get_arrow_changes(&self, source: &Ref) -> BTreeMap<String, Delta> {
        let mut changes = BTreeMap::new();
        let Some(labels) = self.groups.get(source) else {
            return changes;
        };
        for (label, group) in labels {
            let nothing_new = group.retracted.is_empty()
                && group.asserted.len() == group.seen.len()
                && group.marked.len() == group.seen.len();
            if group.complete {
                // An empty complete group is an authoritative "no targets
                // remain" and must still surface as a replace.
                if nothing_new && !group.seen.is_empty() {
                    continue;
                }
                changes.insert(
                    label.clone(),
                    Delta::Replace(group.asserted.iter().cloned().collect()),
                );
            } else {
                if nothing_new {
                    continue;
                }
                let patch = group
                    .seen
                    .iter()
                    .map(|target| (target.clone(), group.asserted.contains(target)))
                    .collect();
                changes.insert(label.clone(), Delta::Patch(patch));
            }
        }
        changes
    }

    /// Returns every node ever touched, mapped to its merged properties, or
    /// `None` if retracted. Related-only nodes appear with no properties.
    pub fn get_nodes(&self) -> BTreeMap<Ref, Option<Node>> {
        self.nodes
            .iter()
            .map(|(key, state)| {
                let node = match state {
                    NodeState::Asserted(props) => Some(Node {
                        key: key.clone(),
                        props: props.clone(),
                    }),
                    NodeState::Related => Some(Node::new(key.clone())),
                    NodeState::Retracted => None,
                };
                (key.clone(), node)
            })
            .collect()
    }

    /// Live asserted targets of a group, if the group exists.
    pub(crate) fn asserted_targets(&self, source: &Ref, label: &str) -> Option<&FxHashSet<Ref>> {
        self.group(source, label).map(|group| &group.asserted)
    }

    fn group(&self, source: &Ref, label: &str) -> Option<&ArrowGroup> {
        self.groups.get(source)?.get(label)
    }

    fn group_mut(&mut self, source: &Ref, label: &str) -> &mut ArrowGroup {
        self.groups
            .entry(source.clone())
            .or_default()
            .entry(label.to_string())
            .or_default()
    }
}
