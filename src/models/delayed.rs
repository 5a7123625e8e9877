use serde::{Deserialize, Serialize};

use super::refinement::{RefinementActor, SerializableActor};
use crate::causality::{ActorCausality, Dependency, PortSignature};

use modal_derive::SerializableActor;

/// The delayed actor produces its outputs a fixed delay after consuming
/// its inputs.  Under the boolean algebra it breaks every dependency; under
/// the real algebra every output depends on every input by the delay.  The
/// actor has state, so all inputs are equivalent.
#[derive(Debug, Clone, Serialize, Deserialize, SerializableActor)]
#[serde(rename_all = "camelCase")]
pub struct Delayed {
    #[serde(default = "default_delay")]
    delay: f64,
}

fn default_delay() -> f64 {
    1.0
}

impl Default for Delayed {
    fn default() -> Self {
        Self {
            delay: default_delay(),
        }
    }
}

impl Delayed {
    pub fn new(delay: f64) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }
}

impl RefinementActor for Delayed {
    fn causality(&self, signature: &PortSignature, default: Dependency) -> ActorCausality {
        let mut causality = ActorCausality::new(signature.clone(), default);
        if let Dependency::Real(_) = default {
            for input in &signature.inputs {
                for output in &signature.outputs {
                    causality.set_dependency(input, output, Dependency::Real(self.delay));
                }
            }
        }
        causality.merge_all_inputs();
        causality
    }

    fn status(&self) -> String {
        format!("Delaying by {}", self.delay)
    }
}
