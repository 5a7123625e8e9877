use std::collections::{BTreeMap, BTreeSet};

use super::{CausalityInterface, Dependency, PortSignature};

/// `ActorCausality` is a tabulated causality interface: explicit
/// dependencies from inputs to outputs, and explicit input equivalence
/// classes.  It describes atomic actors, controllers, and the result of a
/// composite analysis alike.
#[derive(Clone, Debug, PartialEq)]
pub struct ActorCausality {
    signature: PortSignature,
    forward: BTreeMap<String, BTreeMap<String, Dependency>>,
    equivalence: BTreeMap<String, BTreeSet<String>>,
    default: Dependency,
}

impl ActorCausality {
    /// An interface with no dependencies, where each input is alone in its
    /// equivalence class.
    pub fn new(signature: PortSignature, default: Dependency) -> Self {
        let equivalence = signature
            .inputs
            .iter()
            .map(|input| (input.clone(), std::iter::once(input.clone()).collect()))
            .collect();
        Self {
            signature,
            forward: BTreeMap::new(),
            equivalence,
            default,
        }
    }

    /// The interface of an actor that is assumed to have state: every output
    /// depends on every input by the default dependency, and all inputs are
    /// equivalent.
    pub fn all_to_all(signature: PortSignature, default: Dependency) -> Self {
        let mut causality = Self::new(signature, default);
        let inputs = causality.signature.inputs.clone();
        let outputs = causality.signature.outputs.clone();
        for input in &inputs {
            for output in &outputs {
                causality.set_dependency(input, output, default);
            }
        }
        causality.merge_all_inputs();
        causality
    }

    /// Record a dependency.  Recording the oplus identity removes it.
    pub fn set_dependency(&mut self, input: &str, output: &str, dependency: Dependency) {
        if dependency.is_dependent() {
            self.forward
                .entry(input.to_string())
                .or_default()
                .insert(output.to_string(), dependency);
        } else {
            self.remove_dependency(input, output);
        }
    }

    /// Combine a dependency with the one already recorded, by oplus.
    pub fn add_dependency(&mut self, input: &str, output: &str, dependency: Dependency) {
        let combined = self.dependency(input, output).oplus(dependency);
        self.set_dependency(input, output, combined);
    }

    pub fn remove_dependency(&mut self, input: &str, output: &str) {
        if let Some(outputs) = self.forward.get_mut(input) {
            outputs.remove(output);
            if outputs.is_empty() {
                self.forward.remove(input);
            }
        }
    }

    /// Put two inputs, and everything equivalent to either, in one class.
    pub fn merge_equivalent(&mut self, a: &str, b: &str) {
        let mut merged: BTreeSet<String> = self.class_of(a);
        merged.extend(self.class_of(b));
        for member in &merged {
            self.equivalence.insert(member.clone(), merged.clone());
        }
    }

    pub fn merge_all_inputs(&mut self) {
        let all: BTreeSet<String> = self.signature.inputs.iter().cloned().collect();
        for input in &self.signature.inputs {
            self.equivalence.insert(input.clone(), all.clone());
        }
    }

    /// Inputs that affect a common output are equivalent.
    pub fn merge_by_shared_outputs(&mut self) {
        let inputs = self.signature.inputs.clone();
        for (i, a) in inputs.iter().enumerate() {
            for b in inputs.iter().skip(i + 1) {
                let shared = self.signature.outputs.iter().any(|output| {
                    self.dependency(a, output).is_dependent() && self.dependency(b, output).is_dependent()
                });
                if shared {
                    self.merge_equivalent(a, b);
                }
            }
        }
    }

    fn class_of(&self, input: &str) -> BTreeSet<String> {
        self.equivalence
            .get(input)
            .cloned()
            .unwrap_or_else(|| std::iter::once(input.to_string()).collect())
    }
}

impl CausalityInterface for ActorCausality {
    fn dependency(&self, input: &str, output: &str) -> Dependency {
        self.forward
            .get(input)
            .and_then(|outputs| outputs.get(output))
            .copied()
            .unwrap_or_else(|| self.default.oplus_identity())
    }

    fn dependent_ports(&self, port: &str) -> Vec<String> {
        if self.signature.is_input(port) {
            self.forward
                .get(port)
                .map(|outputs| outputs.keys().cloned().collect())
                .unwrap_or_default()
        } else {
            self.forward
                .iter()
                .filter(|(_, outputs)| outputs.contains_key(port))
                .map(|(input, _)| input.clone())
                .collect()
        }
    }

    fn equivalent_ports(&self, input: &str) -> Vec<String> {
        self.class_of(input).into_iter().collect()
    }

    fn default_dependency(&self) -> Dependency {
        self.default
    }

    fn signature(&self) -> &PortSignature {
        &self.signature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature() -> PortSignature {
        PortSignature {
            inputs: vec![String::from("a"), String::from("b"), String::from("c")],
            outputs: vec![String::from("x"), String::from("y")],
        }
    }

    #[test]
    fn all_to_all_depends_everywhere() {
        let causality = ActorCausality::all_to_all(signature(), Dependency::Boolean(true));
        assert!(causality.dependency("a", "y").is_dependent());
        assert_eq!(causality.equivalent_ports("c"), vec!["a", "b", "c"]);
        assert_eq!(causality.dependent_ports("x"), vec!["a", "b", "c"]);
    }

    #[test]
    fn shared_outputs_merge_classes() {
        let mut causality = ActorCausality::new(signature(), Dependency::Boolean(true));
        causality.set_dependency("a", "x", Dependency::Boolean(true));
        causality.set_dependency("b", "x", Dependency::Boolean(true));
        causality.set_dependency("c", "y", Dependency::Boolean(true));
        causality.merge_by_shared_outputs();
        assert_eq!(causality.equivalent_ports("a"), vec!["a", "b"]);
        assert_eq!(causality.equivalent_ports("c"), vec!["c"]);
    }

    #[test]
    fn removed_dependency_reports_identity() {
        let mut causality = ActorCausality::all_to_all(signature(), Dependency::Real(0.0));
        causality.remove_dependency("a", "x");
        assert!(!causality.dependency("a", "x").is_dependent());
        assert_eq!(causality.dependent_ports("a"), vec!["y"]);
    }
}
