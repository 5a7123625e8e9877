use serde::{Deserialize, Serialize};

use super::refinement::{RefinementActor, SerializableActor};
use crate::causality::{ActorCausality, Dependency, PortSignature};

use modal_derive::SerializableActor;

/// The instantaneous actor is the conservative default for a refinement
/// whose behavior is not described further: every output depends on every
/// input within the same reaction, and all inputs are equivalent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, SerializableActor)]
#[serde(rename_all = "camelCase")]
pub struct Instantaneous {}

impl Instantaneous {
    pub fn new() -> Self {
        Self {}
    }
}

impl RefinementActor for Instantaneous {
    fn causality(&self, signature: &PortSignature, default: Dependency) -> ActorCausality {
        ActorCausality::all_to_all(signature.clone(), default)
    }

    fn status(&self) -> String {
        String::from("Instantaneous")
    }
}
