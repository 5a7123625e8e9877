//! The kernel module provides the containment substrate that modal models
//! are built on: an arena of named entities, ports, and relations, with
//! hierarchical containment, name uniqueness within a container, ordered
//! port lists, and a workspace generation counter.
//!
//! Entities, ports, and relations are addressed by copyable ids.  An id
//! stays valid until the object it names is removed; the arena may then
//! reuse the slot, so ids should not be retained across removals.

use serde::{Deserialize, Serialize};

pub mod entity;
mod graph;
pub mod port;
pub mod relation;
pub mod workspace;

pub use self::entity::{Entity, EntityKind};
pub use self::graph::Graph;
pub use self::port::{Port, PortSpec};
pub use self::relation::{Relation, Width};
pub use self::workspace::{Generation, Workspace};

/// The id of an entity (modal model, controller, or refinement).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub(crate) usize);

/// The id of a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortId(pub(crate) usize);

/// The id of a relation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationId(pub(crate) usize);

/// A reordering request for a port within its container's port list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Move {
    Up,
    Down,
    First,
    Last,
    Index(usize),
}
