use js_sys::Array;
use wasm_bindgen::prelude::*;

use crate::causality::summarize;
use crate::models::{refinement_factory, ChangeRequest, ModalModel, RefinementTemplate, Reportable};
use crate::utils::set_panic_hook;

/// The `WebModalModel` provides JS/WASM-compatible interfaces to the core
/// `ModalModel` struct.  Entities are addressed by dotted paths from the
/// top modal model, such as `.top.refinement`.  For additional insight on
/// these methods, refer to the associated `ModalModel` methods.  Errors are
/// unwrapped, instead of returned, in the `WebModalModel` methods.
#[wasm_bindgen]
pub struct WebModalModel {
    model: ModalModel,
}

#[wasm_bindgen]
impl WebModalModel {
    /// A JS/WASM interface for `ModalModel.new`.
    pub fn post(name: &str) -> Self {
        set_panic_hook();
        Self {
            model: ModalModel::new(name).unwrap(),
        }
    }

    /// Create a modal model from a JSON document.
    pub fn post_json(document: &str) -> Self {
        set_panic_hook();
        Self {
            model: ModalModel::from_json(document).unwrap(),
        }
    }

    /// Create a modal model from a YAML document.
    pub fn post_yaml(document: &str) -> Self {
        set_panic_hook();
        Self {
            model: ModalModel::from_yaml(document).unwrap(),
        }
    }

    /// Get a JSON representation of the full `ModalModel`.
    pub fn get_json(&self) -> String {
        self.model.to_json().unwrap()
    }

    /// Get a YAML representation of the full `ModalModel`.
    pub fn get_yaml(&self) -> String {
        self.model.to_yaml().unwrap()
    }

    /// An interface to `Reportable.status`.
    pub fn status(&self) -> String {
        self.model.status()
    }

    /// A JS/WASM interface for `ModalModel.new_port_with`, which uses a JSON
    /// representation of the port.
    pub fn new_port_json(&mut self, entity: &str, port: &str) {
        let entity = self.model.entity_by_path(entity).unwrap();
        self.model
            .new_port_with(entity, &serde_json::from_str(port).unwrap())
            .unwrap();
    }

    /// A JS/WASM interface for `ModalModel.edit_port`, which uses a JSON
    /// representation of the edit.  Returns the number of ports edited.
    pub fn edit_port_json(&mut self, entity: &str, port: &str, edit: &str) -> usize {
        let entity = self.model.entity_by_path(entity).unwrap();
        let port = self.model.port(entity, port).unwrap();
        self.model
            .edit_port(port, serde_json::from_str(edit).unwrap())
            .unwrap()
    }

    /// The port names of an entity, as a JavaScript Array.
    pub fn port_names_js(&self, entity: &str) -> Array {
        let entity = self.model.entity_by_path(entity).unwrap();
        self.model
            .port_names(entity)
            .unwrap()
            .into_iter()
            .map(JsValue::from)
            .collect()
    }

    /// The port names of an entity, as a JSON string.
    pub fn port_names_json(&self, entity: &str) -> String {
        let entity = self.model.entity_by_path(entity).unwrap();
        serde_json::to_string(&self.model.port_names(entity).unwrap()).unwrap()
    }

    /// The full port descriptions of an entity, as a JSON string.
    pub fn ports_json(&self, entity: &str) -> String {
        let entity = self.model.entity_by_path(entity).unwrap();
        let graph = self.model.graph();
        let specs: Vec<_> = graph
            .entity(entity)
            .unwrap()
            .ports()
            .iter()
            .map(|port| graph.port(*port).unwrap().spec())
            .collect();
        serde_json::to_string(&specs).unwrap()
    }

    /// An interface to `ModalModel.add_state`.
    pub fn add_state(&mut self, modal: &str, state: &str) {
        let modal = self.model.entity_by_path(modal).unwrap();
        self.model.add_state(modal, state).unwrap();
    }

    /// An interface to `ModalModel.add_transition`.
    pub fn add_transition(&mut self, modal: &str, name: &str, source: &str, destination: &str) {
        let modal = self.model.entity_by_path(modal).unwrap();
        self.model
            .add_transition(modal, name, source, destination)
            .unwrap();
    }

    /// An interface to `ModalModel.set_guard`.
    pub fn set_guard(&mut self, modal: &str, transition: &str, guard: &str) {
        let modal = self.model.entity_by_path(modal).unwrap();
        self.model.set_guard(modal, transition, guard).unwrap();
    }

    /// An interface to `ModalModel.set_output_actions`.
    pub fn set_output_actions(&mut self, modal: &str, transition: &str, actions: &str) {
        let modal = self.model.entity_by_path(modal).unwrap();
        self.model
            .set_output_actions(modal, transition, actions)
            .unwrap();
    }

    /// An interface to `ModalModel.set_current_state`.
    pub fn set_current_state(&mut self, modal: &str, state: &str) {
        let modal = self.model.entity_by_path(modal).unwrap();
        self.model.set_current_state(modal, state).unwrap();
    }

    /// An interface to `ModalModel.add_refinement`, creating the refinement
    /// from a registered class.
    pub fn add_refinement(&mut self, modal: &str, state: &str, name: &str, class: &str) {
        let modal = self.model.entity_by_path(modal).unwrap();
        self.model
            .add_refinement(modal, state, name, &RefinementTemplate::class(class), None)
            .unwrap();
    }

    /// An interface to `ModalModel.remove_refinement`.
    pub fn remove_refinement(&mut self, refinement: &str) {
        let refinement = self.model.entity_by_path(refinement).unwrap();
        self.model.remove_refinement(refinement).unwrap();
    }

    /// An interface to `ModalModel.remove_unused_refinements`.
    pub fn remove_unused_refinements(&mut self, modal: &str) -> usize {
        let modal = self.model.entity_by_path(modal).unwrap();
        self.model.remove_unused_refinements(modal).unwrap()
    }

    /// The registered refinement classes, as a JavaScript Array.
    pub fn refinement_classes_js() -> Array {
        refinement_factory::classes()
            .into_iter()
            .map(JsValue::from)
            .collect()
    }

    /// A JS/WASM interface for `ModalModel.causality_interface`, which
    /// summarizes the dependencies and equivalence classes as JSON.
    pub fn causality_json(&self, modal: &str) -> String {
        let modal = self.model.entity_by_path(modal).unwrap();
        let causality = self.model.causality_interface(modal).unwrap();
        serde_json::to_string(&summarize(&causality)).unwrap()
    }

    /// A JS/WASM interface for `ModalModel.causality_interface`, which
    /// summarizes the dependencies and equivalence classes as YAML.
    pub fn causality_yaml(&self, modal: &str) -> String {
        let modal = self.model.entity_by_path(modal).unwrap();
        let causality = self.model.causality_interface(modal).unwrap();
        serde_yaml::to_string(&summarize(&causality)).unwrap()
    }

    /// A JS/WASM interface for `ModalModel.request_change`, which uses a
    /// JSON representation of the change request.
    pub fn request_change_json(&mut self, request: &str) {
        let request: ChangeRequest = serde_json::from_str(request).unwrap();
        self.model.request_change(request);
    }

    /// A JS/WASM interface for `ModalModel.request_change`, which uses a
    /// YAML representation of the change request.
    pub fn request_change_yaml(&mut self, request: &str) {
        let request: ChangeRequest = serde_yaml::from_str(request).unwrap();
        self.model.request_change(request);
    }

    /// An interface to `ModalModel.execute_change_requests`.
    pub fn execute_change_requests(&mut self) -> usize {
        self.model.execute_change_requests().unwrap()
    }
}

impl WebModalModel {
    /// The wrapped model, for Rust callers.
    pub fn model(&self) -> &ModalModel {
        &self.model
    }
}
