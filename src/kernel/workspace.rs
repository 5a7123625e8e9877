use serde::{Deserialize, Serialize};
use tracing::trace;

use super::Graph;

/// A monotonic counter of structural changes.  Anything computed from the
/// model structure is valid only while the generation it was computed at is
/// the live one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

/// The `Workspace` owns the object graph of a model and its generation.
/// The generation only advances through `mutated`, which every committed
/// structural edit calls exactly once.
#[derive(Clone, Debug, Default)]
pub struct Workspace {
    graph: Graph,
    generation: Generation,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Record that the structure changed.
    pub fn mutated(&mut self) -> Generation {
        self.generation = self.generation.next();
        trace!(generation = self.generation.value(), "workspace mutated");
        self.generation
    }

    pub(crate) fn restore(&mut self, graph: Graph) {
        self.graph = graph;
    }
}
