//! The causality module answers two questions about an actor: does an
//! output depend on an input within a single reaction, and which inputs
//! have to be treated together (are equivalent).
//!
//! Dependencies form an algebra with two operators.  `oplus` combines
//! alternative paths (the result is at least as conservative as either),
//! `otimes` combines dependencies in series along a path.  The boolean
//! algebra answers yes/no; the real algebra carries a delay, where zero is
//! an instantaneous dependency and infinity is none.

use std::f64::INFINITY;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod actor;
pub mod cache;
pub mod composite;
pub mod mirror;

pub use self::actor::ActorCausality;
pub use self::cache::{CacheStats, CausalityCache};
pub use self::composite::{composite_causality, port_signature};
pub use self::mirror::MirrorCausality;

/// A dependency of an output on an input.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dependency {
    Boolean(bool),
    Real(f64),
}

impl Dependency {
    /// Combine alternative paths.  Mixing the two algebras falls back to
    /// the boolean one.
    pub fn oplus(self, other: Dependency) -> Dependency {
        match (self, other) {
            (Dependency::Real(a), Dependency::Real(b)) => Dependency::Real(f64::min(a, b)),
            (a, b) => Dependency::Boolean(a.is_dependent() || b.is_dependent()),
        }
    }

    /// Combine dependencies in series.
    pub fn otimes(self, other: Dependency) -> Dependency {
        match (self, other) {
            (Dependency::Real(a), Dependency::Real(b)) => Dependency::Real(a + b),
            (a, b) => Dependency::Boolean(a.is_dependent() && b.is_dependent()),
        }
    }

    /// The "no dependency" element of this dependency's algebra.
    pub fn oplus_identity(self) -> Dependency {
        match self {
            Dependency::Boolean(_) => Dependency::Boolean(false),
            Dependency::Real(_) => Dependency::Real(INFINITY),
        }
    }

    /// The "immediate dependency" element of this dependency's algebra.
    pub fn otimes_identity(self) -> Dependency {
        match self {
            Dependency::Boolean(_) => Dependency::Boolean(true),
            Dependency::Real(_) => Dependency::Real(0.0),
        }
    }

    pub fn is_dependent(self) -> bool {
        match self {
            Dependency::Boolean(value) => value,
            Dependency::Real(delay) => delay < INFINITY,
        }
    }
}

/// The dependency algebra a model uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyKind {
    Boolean,
    Real,
}

impl Default for DependencyKind {
    fn default() -> Self {
        DependencyKind::Boolean
    }
}

impl DependencyKind {
    /// The default dependency of an actor: the immediate one.
    pub fn default_dependency(self) -> Dependency {
        match self {
            DependencyKind::Boolean => Dependency::Boolean(true),
            DependencyKind::Real => Dependency::Real(0.0),
        }
    }
}

/// Input and output port names of an actor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSignature {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl PortSignature {
    pub fn is_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|input| input == name)
    }

    pub fn is_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|output| output == name)
    }
}

/// The `CausalityInterface` trait is implemented by everything that can
/// describe the input/output dependencies of an actor.  Ports are named,
/// since interfaces are composed across mirror groups by name.
pub trait CausalityInterface {
    /// The dependency of `output` on `input`; the oplus identity when there
    /// is none or either port is unknown.
    fn dependency(&self, input: &str, output: &str) -> Dependency;

    /// For an input, the outputs depending on it; for an output, the inputs
    /// it depends on.
    fn dependent_ports(&self, port: &str) -> Vec<String>;

    /// The inputs in an equivalence class with `input`, including itself.
    fn equivalent_ports(&self, input: &str) -> Vec<String>;

    fn default_dependency(&self) -> Dependency;

    fn signature(&self) -> &PortSignature;
}

/// A causality interface shared between the cache and its readers.
pub type SharedCausality = Arc<dyn CausalityInterface + Send + Sync>;

/// A serializable listing of a causality interface, for reports and for the
/// editor facade.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CausalitySummary {
    pub dependencies: Vec<DependencyEntry>,
    pub equivalence_classes: Vec<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEntry {
    pub input: String,
    pub output: String,
    pub dependency: Dependency,
}

/// Summarize any causality interface over its own signature.
pub fn summarize(causality: &dyn CausalityInterface) -> CausalitySummary {
    let signature = causality.signature();
    let dependencies = signature
        .inputs
        .iter()
        .flat_map(|input| {
            signature.outputs.iter().filter_map(move |output| {
                let dependency = causality.dependency(input, output);
                if dependency.is_dependent() {
                    Some(DependencyEntry {
                        input: input.clone(),
                        output: output.clone(),
                        dependency,
                    })
                } else {
                    None
                }
            })
        })
        .collect();
    let mut equivalence_classes: Vec<Vec<String>> = Vec::new();
    for input in &signature.inputs {
        let mut class = causality.equivalent_ports(input);
        class.sort();
        if !equivalence_classes.contains(&class) {
            equivalence_classes.push(class);
        }
    }
    CausalitySummary {
        dependencies,
        equivalence_classes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_algebra() {
        let yes = Dependency::Boolean(true);
        let no = Dependency::Boolean(false);
        assert_eq!(yes.oplus(no), yes);
        assert_eq!(yes.otimes(no), no);
        assert_eq!(yes.oplus_identity(), no);
        assert_eq!(no.otimes_identity(), yes);
    }

    #[test]
    fn real_algebra() {
        let now = Dependency::Real(0.0);
        let later = Dependency::Real(2.5);
        assert_eq!(now.oplus(later), now);
        assert_eq!(later.otimes(later), Dependency::Real(5.0));
        assert!(!later.oplus_identity().is_dependent());
        assert!(later.is_dependent());
    }

    #[test]
    fn mixed_algebra_falls_back_to_boolean() {
        let result = Dependency::Real(INFINITY).oplus(Dependency::Boolean(true));
        assert_eq!(result, Dependency::Boolean(true));
    }
}
