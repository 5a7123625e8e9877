use serde::{Deserialize, Serialize};

use super::modal_model::ModalModel;
use super::refinement::RefinementTemplate;
use crate::kernel::PortSpec;
use crate::mirror::PortEdit;
use crate::utils::errors::ModalError;

/// A `ChangeRequest` describes one structural edit by entity paths and
/// names, so that it can be queued, serialized, and executed later.  Paths
/// are dotted from the top modal model, such as `.top.refinement`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeRequest {
    NewPort {
        entity: String,
        port: PortSpec,
    },
    EditPort {
        entity: String,
        port: String,
        edit: PortEdit,
    },
    AddState {
        modal: String,
        state: String,
    },
    #[serde(rename_all = "camelCase")]
    AddTransition {
        modal: String,
        name: String,
        source: String,
        destination: String,
        #[serde(default)]
        guard: String,
        #[serde(default)]
        output_actions: String,
    },
    SetGuard {
        modal: String,
        transition: String,
        guard: String,
    },
    AddRefinement {
        modal: String,
        state: String,
        name: String,
        class: String,
    },
    RemoveRefinement {
        refinement: String,
    },
    SetParameter {
        entity: String,
        name: String,
        value: String,
    },
}

impl ChangeRequest {
    /// A short description for logs.
    pub fn label(&self) -> String {
        match self {
            ChangeRequest::NewPort { entity, port } => format!("NewPort({}.{})", entity, port.name),
            ChangeRequest::EditPort { entity, port, edit } => format!("{} on {}.{}", edit.label(), entity, port),
            ChangeRequest::AddState { modal, state } => format!("AddState({}:{})", modal, state),
            ChangeRequest::AddTransition { modal, name, .. } => format!("AddTransition({}:{})", modal, name),
            ChangeRequest::SetGuard { modal, transition, .. } => format!("SetGuard({}:{})", modal, transition),
            ChangeRequest::AddRefinement { modal, name, .. } => format!("AddRefinement({}.{})", modal, name),
            ChangeRequest::RemoveRefinement { refinement } => format!("RemoveRefinement({})", refinement),
            ChangeRequest::SetParameter { entity, name, .. } => format!("SetParameter({}:{})", entity, name),
        }
    }

    /// Execute the request against a model.  Each underlying edit is a
    /// transaction of its own; a request made of several edits undoes the
    /// ones already made when a later one fails.
    pub fn execute(&self, model: &mut ModalModel) -> Result<(), ModalError> {
        match self {
            ChangeRequest::NewPort { entity, port } => {
                let entity = model.entity_by_path(entity)?;
                model.new_port_with(entity, port).map(|_| ())
            }
            ChangeRequest::EditPort { entity, port, edit } => {
                let entity = model.entity_by_path(entity)?;
                let port = model.port(entity, port)?;
                model.edit_port(port, edit.clone()).map(|_| ())
            }
            ChangeRequest::AddState { modal, state } => {
                let modal = model.entity_by_path(modal)?;
                model.add_state(modal, state)
            }
            ChangeRequest::AddTransition {
                modal,
                name,
                source,
                destination,
                guard,
                output_actions,
            } => {
                let modal = model.entity_by_path(modal)?;
                let snapshot = model.clone();
                let result = model
                    .add_transition(modal, name, source, destination)
                    .and_then(|_| model.set_guard(modal, name, guard))
                    .and_then(|_| model.set_output_actions(modal, name, output_actions));
                if result.is_err() {
                    model.restore_from(snapshot);
                }
                result
            }
            ChangeRequest::SetGuard {
                modal,
                transition,
                guard,
            } => {
                let modal = model.entity_by_path(modal)?;
                model.set_guard(modal, transition, guard)
            }
            ChangeRequest::AddRefinement {
                modal,
                state,
                name,
                class,
            } => {
                let modal = model.entity_by_path(modal)?;
                model
                    .add_refinement(modal, state, name, &RefinementTemplate::class(class), None)
                    .map(|_| ())
            }
            ChangeRequest::RemoveRefinement { refinement } => {
                let refinement = model.entity_by_path(refinement)?;
                model.remove_refinement(refinement)
            }
            ChangeRequest::SetParameter { entity, name, value } => {
                let entity = model.entity_by_path(entity)?;
                model.set_parameter(entity, name, value)
            }
        }
    }
}

/// A `ChangeListener` hears about executed and failed change requests.
pub trait ChangeListener: Send + Sync {
    fn change_executed(&mut self, request: &ChangeRequest);
    fn change_failed(&mut self, request: &ChangeRequest, error: &ModalError);
}
