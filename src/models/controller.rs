use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::guard::{parse_assignments, port_of, referenced_identifiers};
use crate::causality::{ActorCausality, Dependency, PortSignature};
use crate::utils::errors::ModalError;

/// A state of the controller's automaton.  The refinements of a state are
/// named among the modal model's children.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    name: String,
    #[serde(default)]
    initial: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    refinements: Vec<String>,
}

impl State {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_initial(&self) -> bool {
        self.initial
    }

    pub fn refinements(&self) -> &[String] {
        &self.refinements
    }
}

/// A transition between two states.  The guard is a boolean expression
/// over the input ports; output actions assign output ports, set actions
/// assign variables of the controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    name: String,
    source: String,
    destination: String,
    #[serde(default)]
    guard: String,
    #[serde(default)]
    output_actions: String,
    #[serde(default)]
    set_actions: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    refinements: Vec<String>,
}

impl Transition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn guard(&self) -> &str {
        &self.guard
    }

    pub fn output_actions(&self) -> &str {
        &self.output_actions
    }

    pub fn set_actions(&self) -> &str {
        &self.set_actions
    }

    pub fn refinements(&self) -> &[String] {
        &self.refinements
    }
}

/// Which transitions a controller's causality accounts for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Every transition, regardless of the current state.
    All,
    /// The transitions leaving one state.
    State(&'a str),
}

/// The `Fsm` is the automaton a controller carries: states, transitions,
/// the current state, and the transition taken when a refinement reports
/// an error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fsm {
    #[serde(default)]
    states: Vec<State>,
    #[serde(default)]
    transitions: Vec<Transition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_transition: Option<String>,
}

impl Fsm {
    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn state(&self, name: &str) -> Result<&State, ModalError> {
        self.states
            .iter()
            .find(|state| state.name == name)
            .ok_or_else(|| ModalError::StateNotFound(name.to_string()))
    }

    fn state_mut(&mut self, name: &str) -> Result<&mut State, ModalError> {
        self.states
            .iter_mut()
            .find(|state| state.name == name)
            .ok_or_else(|| ModalError::StateNotFound(name.to_string()))
    }

    pub fn transition(&self, name: &str) -> Result<&Transition, ModalError> {
        self.transitions
            .iter()
            .find(|transition| transition.name == name)
            .ok_or_else(|| ModalError::TransitionNotFound(name.to_string()))
    }

    fn transition_mut(&mut self, name: &str) -> Result<&mut Transition, ModalError> {
        self.transitions
            .iter_mut()
            .find(|transition| transition.name == name)
            .ok_or_else(|| ModalError::TransitionNotFound(name.to_string()))
    }

    /// The current state: the explicitly set one, or else the initial one.
    pub fn current_state(&self) -> Option<&State> {
        match &self.current {
            Some(current) => self.state(current).ok(),
            None => self.states.iter().find(|state| state.initial),
        }
    }

    pub fn error_transition(&self) -> Option<&str> {
        self.error_transition.as_deref()
    }

    pub(crate) fn add_state(&mut self, controller: &str, name: &str) -> Result<(), ModalError> {
        if self.states.iter().any(|state| state.name == name) {
            return Err(ModalError::NameDuplication {
                container: controller.to_string(),
                name: name.to_string(),
            });
        }
        self.states.push(State {
            name: name.to_string(),
            initial: self.states.is_empty(),
            refinements: Vec::new(),
        });
        Ok(())
    }

    /// Remove a state with every transition entering or leaving it.
    pub(crate) fn remove_state(&mut self, name: &str) -> Result<State, ModalError> {
        let index = self
            .states
            .iter()
            .position(|state| state.name == name)
            .ok_or_else(|| ModalError::StateNotFound(name.to_string()))?;
        self.transitions
            .retain(|transition| transition.source != name && transition.destination != name);
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
        Ok(self.states.remove(index))
    }

    pub(crate) fn set_initial_state(&mut self, name: &str) -> Result<(), ModalError> {
        self.state(name)?;
        for state in self.states.iter_mut() {
            state.initial = state.name == name;
        }
        Ok(())
    }

    pub(crate) fn set_current_state(&mut self, name: &str) -> Result<(), ModalError> {
        self.state(name)?;
        self.current = Some(name.to_string());
        Ok(())
    }

    /// Return to the initial state.
    pub(crate) fn reset(&mut self) {
        self.current = None;
    }

    pub(crate) fn add_transition(
        &mut self,
        controller: &str,
        name: &str,
        source: &str,
        destination: &str,
    ) -> Result<(), ModalError> {
        self.state(source)?;
        self.state(destination)?;
        if self.transitions.iter().any(|transition| transition.name == name) {
            return Err(ModalError::NameDuplication {
                container: controller.to_string(),
                name: name.to_string(),
            });
        }
        self.transitions.push(Transition {
            name: name.to_string(),
            source: source.to_string(),
            destination: destination.to_string(),
            guard: String::new(),
            output_actions: String::new(),
            set_actions: String::new(),
            refinements: Vec::new(),
        });
        Ok(())
    }

    pub(crate) fn remove_transition(&mut self, name: &str) -> Result<Transition, ModalError> {
        let index = self
            .transitions
            .iter()
            .position(|transition| transition.name == name)
            .ok_or_else(|| ModalError::TransitionNotFound(name.to_string()))?;
        if self.error_transition.as_deref() == Some(name) {
            self.error_transition = None;
        }
        Ok(self.transitions.remove(index))
    }

    pub(crate) fn set_guard(&mut self, transition: &str, guard: &str) -> Result<(), ModalError> {
        self.transition_mut(transition)?.guard = guard.to_string();
        Ok(())
    }

    pub(crate) fn set_output_actions(&mut self, transition: &str, actions: &str) -> Result<(), ModalError> {
        self.transition_mut(transition)?.output_actions = actions.to_string();
        Ok(())
    }

    pub(crate) fn set_set_actions(&mut self, transition: &str, actions: &str) -> Result<(), ModalError> {
        self.transition_mut(transition)?.set_actions = actions.to_string();
        Ok(())
    }

    pub(crate) fn set_error_transition(&mut self, transition: Option<&str>) -> Result<(), ModalError> {
        if let Some(transition) = transition {
            self.transition(transition)?;
        }
        self.error_transition = transition.map(String::from);
        Ok(())
    }

    pub(crate) fn add_state_refinement(&mut self, state: &str, refinement: &str) -> Result<(), ModalError> {
        let state = self.state_mut(state)?;
        if !state.refinements.iter().any(|name| name == refinement) {
            state.refinements.push(refinement.to_string());
        }
        Ok(())
    }

    pub(crate) fn set_transition_refinements(
        &mut self,
        transition: &str,
        refinements: Vec<String>,
    ) -> Result<(), ModalError> {
        self.transition_mut(transition)?.refinements = refinements;
        Ok(())
    }

    /// Strip a refinement name from every state and transition.
    pub(crate) fn forget_refinement(&mut self, refinement: &str) {
        for state in self.states.iter_mut() {
            state.refinements.retain(|name| name != refinement);
        }
        for transition in self.transitions.iter_mut() {
            transition.refinements.retain(|name| name != refinement);
        }
    }

    /// Whether any state or transition names the refinement.
    pub fn refers_to(&self, refinement: &str) -> bool {
        self.states
            .iter()
            .any(|state| state.refinements.iter().any(|name| name == refinement))
            || self
                .transitions
                .iter()
                .any(|transition| transition.refinements.iter().any(|name| name == refinement))
    }

    /// Take the error transition, when there is one leaving the current
    /// state.  Returns whether the error was handled.
    pub(crate) fn handle_error(&mut self) -> bool {
        let current = match self.current_state() {
            Some(state) => state.name.clone(),
            None => return false,
        };
        let destination = match self
            .error_transition
            .as_deref()
            .and_then(|name| self.transition(name).ok())
        {
            Some(transition) if transition.source == current => transition.destination.clone(),
            _ => return false,
        };
        self.current = Some(destination);
        true
    }

    /// The causality of the controller.  An output assigned by a
    /// transition's output actions depends on the inputs that transition's
    /// guard reads and on the inputs the assigned expression reads.  Guards
    /// may read any input, so all inputs are equivalent.
    pub fn causality(
        &self,
        signature: &PortSignature,
        default: Dependency,
        scope: Scope<'_>,
    ) -> Result<ActorCausality, ModalError> {
        let mut causality = ActorCausality::new(signature.clone(), default);
        let transitions = self.transitions.iter().filter(|transition| match scope {
            Scope::All => true,
            Scope::State(state) => transition.source == state,
        });
        for transition in transitions {
            let guard_inputs = read_inputs(signature, &transition.guard)?;
            for (target, value) in parse_assignments(&transition.output_actions)? {
                if !signature.is_output(&target) {
                    continue;
                }
                let mut inputs = guard_inputs.clone();
                inputs.extend(read_inputs(signature, &value)?);
                for input in inputs {
                    causality.add_dependency(&input, &target, default);
                }
            }
            // Set actions cannot produce outputs, but a malformed one is
            // still reported.
            parse_assignments(&transition.set_actions)?;
        }
        causality.merge_all_inputs();
        Ok(causality)
    }
}

fn read_inputs(signature: &PortSignature, expression: &str) -> Result<BTreeSet<String>, ModalError> {
    Ok(referenced_identifiers(expression)?
        .iter()
        .map(|identifier| port_of(identifier))
        .filter(|port| signature.is_input(port))
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::causality::CausalityInterface;

    fn fsm() -> Fsm {
        let mut fsm = Fsm::default();
        fsm.add_state("_Controller", "idle").unwrap();
        fsm.add_state("_Controller", "busy").unwrap();
        fsm.add_transition("_Controller", "start", "idle", "busy").unwrap();
        fsm.add_transition("_Controller", "stop", "busy", "idle").unwrap();
        fsm
    }

    fn signature() -> PortSignature {
        PortSignature {
            inputs: vec![String::from("go"), String::from("level")],
            outputs: vec![String::from("alarm")],
        }
    }

    #[test]
    fn first_state_is_initial() {
        let fsm = fsm();
        assert_eq!(fsm.current_state().map(State::name), Some("idle"));
    }

    #[test]
    fn guard_inputs_feed_assigned_outputs() {
        let mut fsm = fsm();
        fsm.set_guard("start", "go_isPresent").unwrap();
        fsm.set_output_actions("start", "alarm = level * 2").unwrap();
        let yes = Dependency::Boolean(true);
        let all = fsm.causality(&signature(), yes, Scope::All).unwrap();
        assert!(all.dependency("go", "alarm").is_dependent());
        assert!(all.dependency("level", "alarm").is_dependent());
        let busy = fsm.causality(&signature(), yes, Scope::State("busy")).unwrap();
        assert!(!busy.dependency("go", "alarm").is_dependent());
        assert_eq!(busy.equivalent_ports("go"), vec!["go", "level"]);
    }

    #[test]
    fn error_transition_leaves_current_state() {
        let mut fsm = fsm();
        fsm.set_error_transition(Some("stop")).unwrap();
        assert!(!fsm.handle_error());
        fsm.set_current_state("busy").unwrap();
        assert!(fsm.handle_error());
        assert_eq!(fsm.current_state().map(State::name), Some("idle"));
    }

    #[test]
    fn removing_a_state_removes_its_transitions() {
        let mut fsm = fsm();
        fsm.remove_state("busy").unwrap();
        assert!(fsm.transitions().is_empty());
        assert!(matches!(fsm.state("busy"), Err(ModalError::StateNotFound(_))));
    }
}
