//! The models module provides the modal model itself, the controller
//! automaton that selects between refinements, and a set of prebuilt
//! refinement actors.  Additionally, this module specifies the requirements
//! of any additional custom refinement actors, via the `RefinementActor`
//! trait.

use serde::{Deserialize, Serialize};

pub mod actor_repr;
pub mod change;
pub mod config;
pub mod controller;
pub mod declared;
pub mod delayed;
pub mod document;
pub mod guard;
pub mod instantaneous;
pub mod modal_model;
mod ports;
pub mod refinement;
pub mod refinement_factory;
pub mod shared;

pub use self::actor_repr::ActorRepr;
pub use self::change::{ChangeListener, ChangeRequest};
pub use self::config::ModalConfig;
pub use self::controller::{Fsm, Scope, State, Transition};
pub use self::declared::{Declared, DeclaredDependency};
pub use self::delayed::Delayed;
pub use self::document::{ModalDocument, ModelDocument, RefinementDocument};
pub use self::instantaneous::Instantaneous;
pub use self::modal_model::{ModalCausality, ModalModel, TypeConstraint};
pub use self::refinement::{
    InstanceOpener, RefinementActor, RefinementBody, RefinementTemplate, SerializableActor,
};
pub use self::shared::SharedModel;

/// A record of one committed structural edit.  Records are only kept when
/// the model's configuration asks for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRecord {
    pub generation: u64,
    pub action: String,
    pub subject: String,
    pub ports: usize,
}

/// The status and record-keeping methods of `Reportable` support editing
/// tools and debugging, but do not affect the model.
pub trait Reportable {
    fn status(&self) -> String;
    fn records(&self) -> &Vec<EditRecord>;
}
