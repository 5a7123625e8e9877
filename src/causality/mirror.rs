use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::{CausalityInterface, Dependency, PortSignature, SharedCausality};
use crate::kernel::Generation;

/// `MirrorCausality` composes the causality interfaces of the members of a
/// modal model's mirror groups: the controller, and the refinements active
/// in one state.  Ports are matched by name, so a dependency of the owner is
/// the `oplus` of the dependencies between the same-named ports of every
/// composed interface.
pub struct MirrorCausality {
    signature: PortSignature,
    composed: Vec<SharedCausality>,
    equivalence: BTreeMap<String, BTreeSet<String>>,
    default: Dependency,
    generation: Generation,
}

impl MirrorCausality {
    /// Seed the composition with the controller's interface.
    pub fn new(
        signature: PortSignature,
        controller: SharedCausality,
        default: Dependency,
        generation: Generation,
    ) -> Self {
        let mut causality = Self {
            signature,
            composed: Vec::new(),
            equivalence: BTreeMap::new(),
            default,
            generation,
        };
        causality.compose_with(controller);
        causality
    }

    pub fn compose_with(&mut self, other: SharedCausality) {
        self.composed.push(other);
        self.recompute_equivalence();
    }

    /// The workspace generation this composition was computed at.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn composed_len(&self) -> usize {
        self.composed.len()
    }

    fn recompute_equivalence(&mut self) {
        self.equivalence.clear();
        for input in &self.signature.inputs {
            let mut class: BTreeSet<String> = BTreeSet::new();
            class.insert(input.clone());
            for causality in &self.composed {
                if !causality.signature().is_input(input) {
                    continue;
                }
                class.extend(
                    causality
                        .equivalent_ports(input)
                        .into_iter()
                        .filter(|port| self.signature.is_input(port)),
                );
            }
            self.equivalence.insert(input.clone(), class);
        }
    }
}

impl CausalityInterface for MirrorCausality {
    fn dependency(&self, input: &str, output: &str) -> Dependency {
        self.composed
            .iter()
            .fold(self.default.oplus_identity(), |result, causality| {
                result.oplus(causality.dependency(input, output))
            })
    }

    fn dependent_ports(&self, port: &str) -> Vec<String> {
        let owner_is_input = self.signature.is_input(port);
        let mut ports: BTreeSet<String> = BTreeSet::new();
        for causality in &self.composed {
            for dependent in causality.dependent_ports(port) {
                let known = if owner_is_input {
                    self.signature.is_output(&dependent)
                } else {
                    self.signature.is_input(&dependent)
                };
                if known {
                    ports.insert(dependent);
                }
            }
        }
        ports.into_iter().collect()
    }

    fn equivalent_ports(&self, input: &str) -> Vec<String> {
        match self.equivalence.get(input) {
            Some(class) => class.iter().cloned().collect(),
            None => vec![input.to_string()],
        }
    }

    fn default_dependency(&self) -> Dependency {
        self.default
    }

    fn signature(&self) -> &PortSignature {
        &self.signature
    }
}

impl fmt::Debug for MirrorCausality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorCausality")
            .field("signature", &self.signature)
            .field("composed", &self.composed.len())
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::causality::ActorCausality;

    fn signature() -> PortSignature {
        PortSignature {
            inputs: vec![String::from("in1"), String::from("in2")],
            outputs: vec![String::from("out")],
        }
    }

    #[test]
    fn composition_combines_by_oplus() {
        let yes = Dependency::Boolean(true);
        let controller = ActorCausality::new(signature(), yes);
        let mut refinement = ActorCausality::new(signature(), yes);
        refinement.set_dependency("in2", "out", yes);
        let mut causality = MirrorCausality::new(signature(), Arc::new(controller), yes, Generation::default());
        assert!(!causality.dependency("in2", "out").is_dependent());
        causality.compose_with(Arc::new(refinement));
        assert!(causality.dependency("in2", "out").is_dependent());
        assert!(!causality.dependency("in1", "out").is_dependent());
        assert_eq!(causality.dependent_ports("out"), vec!["in2"]);
    }

    #[test]
    fn equivalence_unions_sub_interfaces() {
        let yes = Dependency::Boolean(true);
        let mut controller = ActorCausality::new(signature(), yes);
        controller.merge_all_inputs();
        let causality = MirrorCausality::new(signature(), Arc::new(controller), yes, Generation::default());
        assert_eq!(causality.equivalent_ports("in1"), vec!["in1", "in2"]);
    }
}
