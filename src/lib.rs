//! Mutation-consistency core for a schema-aware graph data store.
//!
//! `umbral` collects the node and relationship changes of one logical write
//! operation, rejects internally contradictory requests the moment they are
//! issued, and reads back the minimal diff a storage backend needs to apply.
//! It never touches the backing store itself: dropping a ledger abandons the
//! prospective change set, so there is nothing to roll back.
//!
//! Two layers:
//!
//! - [`MutationLedger`]: schema-agnostic node/arrow mutation tracking with
//!   conflict detection and per-relationship diffing.
//! - [`Reconciler`]: schema-aware wrapper keeping forward relationships and
//!   their declared inverses in sync across one write operation.
//!
//! ```rust
//! use umbral::{Delta, InverseMap, Reconciler, Ref, Resource};
//!
//! let schema = InverseMap::new()
//!     .relate("teams", "players", "players", "team")
//!     .to_one("players", "team");
//! let mut rec = Reconciler::new(schema);
//!
//! let mut team = Resource::new(Ref::new("teams", "t1"));
//! team.relationships
//!     .insert("players".into(), vec![Ref::new("players", "p1")]);
//! rec.assert_resource(&team, None)?;
//!
//! let changes = rec.get_relationship_changes(&Ref::new("teams", "t1"));
//! assert!(matches!(changes.get("players"), Some(Delta::Replace(_))));
//! # Ok::<(), umbral::ReconcileError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ledger;
pub mod model;
pub mod reconcile;
pub mod schema;

pub use error::{ConflictError, ReconcileError};
pub use ledger::{Delta, MutationLedger};
pub use model::{Arrow, Node, PropMap, PropValue, Ref, Resource};
pub use reconcile::Reconciler;
pub use schema::{InverseMap, RelationshipSchema};
