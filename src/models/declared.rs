use serde::{Deserialize, Serialize};

use super::refinement::{RefinementActor, SerializableActor};
use crate::causality::{ActorCausality, Dependency, PortSignature};

use modal_derive::SerializableActor;

/// The declared actor states its dependencies explicitly, as a list of
/// input/output pairs with an optional delay.  Pairs naming ports the
/// refinement does not have are ignored.  Inputs that affect a common
/// output are equivalent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, SerializableActor)]
#[serde(rename_all = "camelCase")]
pub struct Declared {
    #[serde(default)]
    dependencies: Vec<DeclaredDependency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredDependency {
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub delay: f64,
}

impl Declared {
    pub fn new(dependencies: Vec<DeclaredDependency>) -> Self {
        Self { dependencies }
    }

    /// Declare an instantaneous dependency of `output` on `input`.
    pub fn with(mut self, input: &str, output: &str) -> Self {
        self.dependencies.push(DeclaredDependency {
            input: input.to_string(),
            output: output.to_string(),
            delay: 0.0,
        });
        self
    }

    pub fn dependencies(&self) -> &[DeclaredDependency] {
        &self.dependencies
    }
}

impl RefinementActor for Declared {
    fn causality(&self, signature: &PortSignature, default: Dependency) -> ActorCausality {
        let mut causality = ActorCausality::new(signature.clone(), default);
        for declared in &self.dependencies {
            if !signature.is_input(&declared.input) || !signature.is_output(&declared.output) {
                continue;
            }
            let dependency = match default {
                Dependency::Boolean(_) => Dependency::Boolean(declared.delay == 0.0),
                Dependency::Real(_) => Dependency::Real(declared.delay),
            };
            causality.add_dependency(&declared.input, &declared.output, dependency);
        }
        causality.merge_by_shared_outputs();
        causality
    }

    fn status(&self) -> String {
        format!("Declaring {} dependencies", self.dependencies.len())
    }
}
