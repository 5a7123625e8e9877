use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use super::change::{ChangeListener, ChangeRequest};
use super::config::ModalConfig;
use super::controller::{Fsm, Scope};
use super::document::ModelDocument;
use super::ports;
use super::refinement::{InstanceOpener, RefinementTemplate};
use super::{EditRecord, Reportable};
use crate::causality::{
    composite_causality, port_signature, ActorCausality, CacheStats, CausalityCache, CausalityInterface,
    Dependency, MirrorCausality, PortSignature, SharedCausality,
};
use crate::kernel::{EntityId, EntityKind, Generation, Graph, Move, PortId, PortSpec, Workspace};
use crate::mirror::{propagate, resolve_group, Direction, EditContext, MirrorGroup, PortEdit};
use crate::utils;
use crate::utils::errors::ModalError;

/// The current states of the nested modal models below an entity.  Their
/// precise causality feeds the entity's, so cache entries are keyed by it.
type NestedStates = Vec<(EntityId, String)>;

#[derive(Debug, Default)]
struct Caches {
    states: CausalityCache<(EntityId, String, NestedStates), MirrorCausality>,
    composites: CausalityCache<(EntityId, NestedStates), ActorCausality>,
}

/// The answer of a causality query on a modal model.
#[derive(Clone, Debug)]
pub enum ModalCausality {
    /// The causality of the whole composite, valid in every state.
    Conservative(Arc<ActorCausality>),
    /// The causality of the current state only.
    StateDependent(Arc<MirrorCausality>),
}

impl ModalCausality {
    pub fn is_state_dependent(&self) -> bool {
        matches!(self, ModalCausality::StateDependent(_))
    }

    pub fn shared(&self) -> SharedCausality {
        match self {
            ModalCausality::Conservative(causality) => causality.clone(),
            ModalCausality::StateDependent(causality) => causality.clone(),
        }
    }

    fn interface(&self) -> &dyn CausalityInterface {
        match self {
            ModalCausality::Conservative(causality) => causality.as_ref(),
            ModalCausality::StateDependent(causality) => causality.as_ref(),
        }
    }
}

impl CausalityInterface for ModalCausality {
    fn dependency(&self, input: &str, output: &str) -> Dependency {
        self.interface().dependency(input, output)
    }

    fn dependent_ports(&self, port: &str) -> Vec<String> {
        self.interface().dependent_ports(port)
    }

    fn equivalent_ports(&self, input: &str) -> Vec<String> {
        self.interface().equivalent_ports(input)
    }

    fn default_dependency(&self) -> Dependency {
        self.interface().default_dependency()
    }

    fn signature(&self) -> &PortSignature {
        self.interface().signature()
    }
}

/// A type inequality between two ports: the type of `lesser` must be less
/// than or equal to the type of `greater`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeConstraint {
    pub lesser: PortId,
    pub greater: PortId,
}

/// The `ModalModel` owns a workspace holding one modal model: its
/// controller, its refinements, and any nested modal models.  Every
/// structural edit goes through the model, which keeps the mirror groups
/// consistent and makes each edit transactional: an edit that fails leaves
/// the model exactly as it was.
pub struct ModalModel {
    workspace: Workspace,
    root: EntityId,
    config: ModalConfig,
    mirror_disabled: BTreeSet<EntityId>,
    caches: Mutex<Caches>,
    records: Vec<EditRecord>,
    pending: Vec<ChangeRequest>,
    listeners: Vec<Box<dyn ChangeListener>>,
}

impl ModalModel {
    /// Create a modal model with the default configuration.
    pub fn new(name: &str) -> Result<Self, ModalError> {
        Self::with_config(name, ModalConfig::default())
    }

    /// Create a modal model, with its controller, from a configuration.
    pub fn with_config(name: &str, config: ModalConfig) -> Result<Self, ModalError> {
        utils::set_panic_hook();
        let mut workspace = Workspace::new();
        let root = workspace.graph_mut().insert_entity(None, name, EntityKind::Modal)?;
        workspace.graph_mut().insert_entity(
            Some(root),
            &config.controller_name,
            EntityKind::Controller(Fsm::default()),
        )?;
        Ok(Self {
            workspace,
            root,
            config,
            mirror_disabled: BTreeSet::new(),
            caches: Mutex::new(Caches::default()),
            records: Vec::new(),
            pending: Vec::new(),
            listeners: Vec::new(),
        })
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    pub fn graph(&self) -> &Graph {
        self.workspace.graph()
    }

    pub fn generation(&self) -> Generation {
        self.workspace.generation()
    }

    pub fn config(&self) -> &ModalConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        self.graph().entity(self.root).map_or("", |entity| entity.name())
    }

    fn default_dependency(&self) -> Dependency {
        self.config.dependency.default_dependency()
    }

    /// Run a structural edit as a transaction.  The graph and the mirror
    /// disable set are restored when the edit fails; a committed edit
    /// advances the generation exactly once.
    fn transact<T, F>(&mut self, action: &str, subject: &str, edit: F) -> Result<T, ModalError>
    where
        F: FnOnce(&mut EditContext<'_>) -> Result<T, ModalError>,
    {
        let snapshot = self.workspace.graph().clone();
        let disabled = self.mirror_disabled.clone();
        let (result, touched) = {
            let mut cx = EditContext::new(self.workspace.graph_mut(), &mut self.mirror_disabled);
            let result = edit(&mut cx);
            let touched: BTreeSet<PortId> = cx.touched.iter().copied().collect();
            (result, touched.len())
        };
        match result {
            Ok(value) => {
                let generation = self.workspace.mutated();
                debug!(
                    action = %action,
                    subject = %subject,
                    ports = touched,
                    generation = generation.value(),
                    "committed edit"
                );
                if self.config.store_records {
                    self.records.push(EditRecord {
                        generation: generation.value(),
                        action: action.to_string(),
                        subject: subject.to_string(),
                        ports: touched,
                    });
                }
                Ok(value)
            }
            Err(error) => {
                self.workspace.restore(snapshot);
                self.mirror_disabled = disabled;
                warn!(action = %action, subject = %subject, error = %error, "rolled back edit");
                Err(error)
            }
        }
    }

    // Lookups

    /// Resolve a dotted path such as `.top.refinement` to an entity.
    pub fn entity_by_path(&self, path: &str) -> Result<EntityId, ModalError> {
        let graph = self.graph();
        let mut names = path.trim_start_matches('.').split('.');
        let not_found = || ModalError::EntityNotFound(path.to_string());
        if names.next() != Some(self.name()) {
            return Err(not_found());
        }
        names.try_fold(self.root, |entity, name| graph.find_entity(entity, name).ok_or_else(not_found))
    }

    pub fn port(&self, entity: EntityId, name: &str) -> Result<PortId, ModalError> {
        self.graph()
            .find_port(entity, name)
            .ok_or_else(|| ModalError::PortNotFound(format!("{}.{}", self.graph().full_name(entity), name)))
    }

    pub fn port_names(&self, entity: EntityId) -> Result<Vec<String>, ModalError> {
        let graph = self.graph();
        graph
            .entity(entity)?
            .ports()
            .iter()
            .map(|port| graph.port(*port).map(|port| port.name().to_string()))
            .collect()
    }

    /// The index of a port within its container's port list.
    pub fn port_index(&self, port: PortId) -> Result<usize, ModalError> {
        let graph = self.graph();
        let container = graph.port(port)?.container();
        graph
            .entity(container)?
            .ports()
            .iter()
            .position(|candidate| *candidate == port)
            .ok_or_else(|| ModalError::InternalError(format!("{} is not listed in its container", graph.port_full_name(port))))
    }

    pub fn mirror_group(&self, port: PortId) -> Result<MirrorGroup, ModalError> {
        resolve_group(self.graph(), port)
    }

    pub fn controller(&self, modal: EntityId) -> Result<EntityId, ModalError> {
        controller_of(self.graph(), modal)
    }

    pub fn fsm(&self, modal: EntityId) -> Result<&Fsm, ModalError> {
        fsm_of(self.graph(), modal)
    }

    /// The refinements of a modal model: its children other than the
    /// controller, in order.
    pub fn refinements(&self, modal: EntityId) -> Result<Vec<EntityId>, ModalError> {
        let graph = self.graph();
        let mut refinements = Vec::new();
        for child in modal_entity(graph, modal)?.entities() {
            if !graph.entity(*child)?.is_controller() {
                refinements.push(*child);
            }
        }
        Ok(refinements)
    }

    /// The refinements a state names, resolved among the modal model's
    /// children.
    pub fn state_refinements(&self, modal: EntityId, state: &str) -> Result<Vec<EntityId>, ModalError> {
        let graph = self.graph();
        fsm_of(graph, modal)?
            .state(state)?
            .refinements()
            .iter()
            .map(|name| {
                graph
                    .find_entity(modal, name)
                    .ok_or_else(|| ModalError::EntityNotFound(format!("{}.{}", graph.full_name(modal), name)))
            })
            .collect()
    }

    pub fn is_mirror_disabled(&self, entity: EntityId) -> bool {
        self.mirror_disabled.contains(&entity)
    }

    // Ports

    /// Create a port on any member of a modal model.  The port appears on
    /// the modal model, its controller, and every refinement, linked by the
    /// modal model's `<name>Relation`.
    pub fn new_port(&mut self, entity: EntityId, name: &str) -> Result<PortId, ModalError> {
        let subject = format!("{}.{}", self.graph().full_name(entity), name);
        self.transact("NewPort", &subject, |cx| ports::new_port(cx, entity, name))
    }

    /// Create a port and give it the flags and values of `spec`.
    pub fn new_port_with(&mut self, entity: EntityId, spec: &PortSpec) -> Result<PortId, ModalError> {
        let subject = format!("{}.{}", self.graph().full_name(entity), spec.name);
        self.transact("NewPort", &subject, |cx| ports::new_port_with(cx, entity, spec))
    }

    /// Add a port through the generic child path, as pasting does.
    /// Controllers and refinements only accept ports their modal model
    /// already has.
    pub fn add_port(&mut self, entity: EntityId, spec: &PortSpec) -> Result<PortId, ModalError> {
        let subject = format!("{}.{}", self.graph().full_name(entity), spec.name);
        self.transact("AddPort", &subject, |cx| ports::add_port(cx, entity, spec))
    }

    /// Apply a structural edit to a port and its whole mirror group.
    /// Returns the number of ports the edit was applied to.
    pub fn edit_port(&mut self, port: PortId, edit: PortEdit) -> Result<usize, ModalError> {
        let subject = self.graph().port_full_name(port);
        self.graph().port(port)?;
        self.transact(&edit.label(), &subject, |cx| {
            propagate(cx, port, &edit, Direction::None, &mut BTreeSet::new())
        })
    }

    pub fn set_input(&mut self, port: PortId, input: bool) -> Result<(), ModalError> {
        self.edit_port(port, PortEdit::Input(input)).map(|_| ())
    }

    pub fn set_output(&mut self, port: PortId, output: bool) -> Result<(), ModalError> {
        self.edit_port(port, PortEdit::Output(output)).map(|_| ())
    }

    pub fn set_multiport(&mut self, port: PortId, multiport: bool) -> Result<(), ModalError> {
        self.edit_port(port, PortEdit::Multiport(multiport)).map(|_| ())
    }

    pub fn rename_port(&mut self, port: PortId, name: &str) -> Result<(), ModalError> {
        self.edit_port(port, PortEdit::Rename(name.to_string())).map(|_| ())
    }

    pub fn remove_port(&mut self, port: PortId) -> Result<(), ModalError> {
        self.edit_port(port, PortEdit::Remove).map(|_| ())
    }

    pub fn set_declared_type(&mut self, port: PortId, declared_type: Option<&str>) -> Result<(), ModalError> {
        self.edit_port(port, PortEdit::DeclaredType(declared_type.map(String::from)))
            .map(|_| ())
    }

    pub fn set_default_value(&mut self, port: PortId, default_value: Option<&str>) -> Result<(), ModalError> {
        self.edit_port(port, PortEdit::DefaultValue(default_value.map(String::from)))
            .map(|_| ())
    }

    /// Reorder a port, and its mirror group with it.  Returns the index the
    /// port had before, or `None` when it did not move.
    pub fn move_port(&mut self, port: PortId, to: Move) -> Result<Option<usize>, ModalError> {
        let before = self.port_index(port)?;
        self.edit_port(port, PortEdit::Move(to))?;
        let after = self.port_index(port)?;
        Ok(if before == after { None } else { Some(before) })
    }

    pub fn move_up(&mut self, port: PortId) -> Result<Option<usize>, ModalError> {
        self.move_port(port, Move::Up)
    }

    pub fn move_down(&mut self, port: PortId) -> Result<Option<usize>, ModalError> {
        self.move_port(port, Move::Down)
    }

    pub fn move_to_first(&mut self, port: PortId) -> Result<Option<usize>, ModalError> {
        self.move_port(port, Move::First)
    }

    pub fn move_to_last(&mut self, port: PortId) -> Result<Option<usize>, ModalError> {
        self.move_port(port, Move::Last)
    }

    pub fn move_to_index(&mut self, port: PortId, index: usize) -> Result<Option<usize>, ModalError> {
        self.move_port(port, Move::Index(index))
    }

    /// Run `action` with the mirroring of `entity` disabled.  Edits issued
    /// on the entity's ports meanwhile apply to the entity (and, for a
    /// modal model, downward) only.  The previous setting is restored
    /// afterwards, whether or not the action succeeds.
    pub fn with_mirror_disabled<T, F>(&mut self, entity: EntityId, action: F) -> Result<T, ModalError>
    where
        F: FnOnce(&mut ModalModel) -> Result<T, ModalError>,
    {
        self.graph().entity(entity)?;
        let inserted = self.mirror_disabled.insert(entity);
        let result = action(self);
        if inserted {
            self.mirror_disabled.remove(&entity);
        }
        result
    }

    // Controller

    pub fn add_state(&mut self, modal: EntityId, name: &str) -> Result<(), ModalError> {
        let subject = format!("{}:{}", self.graph().full_name(modal), name);
        self.transact("AddState", &subject, |cx| {
            let controller = controller_of(cx.graph, modal)?;
            let controller_name = cx.graph.full_name(controller);
            fsm_of_mut(cx.graph, modal)?.add_state(&controller_name, name)
        })
    }

    pub fn remove_state(&mut self, modal: EntityId, name: &str) -> Result<(), ModalError> {
        let subject = format!("{}:{}", self.graph().full_name(modal), name);
        self.transact("RemoveState", &subject, |cx| {
            fsm_of_mut(cx.graph, modal)?.remove_state(name).map(|_| ())
        })
    }

    pub fn set_initial_state(&mut self, modal: EntityId, name: &str) -> Result<(), ModalError> {
        let subject = format!("{}:{}", self.graph().full_name(modal), name);
        self.transact("SetInitialState", &subject, |cx| {
            fsm_of_mut(cx.graph, modal)?.set_initial_state(name)
        })
    }

    pub fn add_transition(
        &mut self,
        modal: EntityId,
        name: &str,
        source: &str,
        destination: &str,
    ) -> Result<(), ModalError> {
        let subject = format!("{}:{}", self.graph().full_name(modal), name);
        self.transact("AddTransition", &subject, |cx| {
            let controller = controller_of(cx.graph, modal)?;
            let controller_name = cx.graph.full_name(controller);
            fsm_of_mut(cx.graph, modal)?.add_transition(&controller_name, name, source, destination)
        })
    }

    pub fn remove_transition(&mut self, modal: EntityId, name: &str) -> Result<(), ModalError> {
        let subject = format!("{}:{}", self.graph().full_name(modal), name);
        self.transact("RemoveTransition", &subject, |cx| {
            fsm_of_mut(cx.graph, modal)?.remove_transition(name).map(|_| ())
        })
    }

    pub fn set_guard(&mut self, modal: EntityId, transition: &str, guard: &str) -> Result<(), ModalError> {
        let subject = format!("{}:{}", self.graph().full_name(modal), transition);
        self.transact("SetGuard", &subject, |cx| {
            fsm_of_mut(cx.graph, modal)?.set_guard(transition, guard)
        })
    }

    pub fn set_output_actions(&mut self, modal: EntityId, transition: &str, actions: &str) -> Result<(), ModalError> {
        let subject = format!("{}:{}", self.graph().full_name(modal), transition);
        self.transact("SetOutputActions", &subject, |cx| {
            fsm_of_mut(cx.graph, modal)?.set_output_actions(transition, actions)
        })
    }

    pub fn set_set_actions(&mut self, modal: EntityId, transition: &str, actions: &str) -> Result<(), ModalError> {
        let subject = format!("{}:{}", self.graph().full_name(modal), transition);
        self.transact("SetSetActions", &subject, |cx| {
            fsm_of_mut(cx.graph, modal)?.set_set_actions(transition, actions)
        })
    }

    /// Name the transition taken when a refinement reports an error.
    pub fn set_error_transition(&mut self, modal: EntityId, transition: Option<&str>) -> Result<(), ModalError> {
        let subject = self.graph().full_name(modal);
        self.transact("SetErrorTransition", &subject, |cx| {
            fsm_of_mut(cx.graph, modal)?.set_error_transition(transition)
        })
    }

    /// Name the refinements a transition activates.
    pub fn set_transition_refinements(
        &mut self,
        modal: EntityId,
        transition: &str,
        refinements: &[&str],
    ) -> Result<(), ModalError> {
        let subject = format!("{}:{}", self.graph().full_name(modal), transition);
        self.transact("SetTransitionRefinements", &subject, |cx| {
            for name in refinements {
                if cx.graph.find_entity(modal, name).is_none() {
                    return Err(ModalError::EntityNotFound(format!("{}.{}", cx.graph.full_name(modal), name)));
                }
            }
            let names = refinements.iter().map(|name| name.to_string()).collect();
            fsm_of_mut(cx.graph, modal)?.set_transition_refinements(transition, names)
        })
    }

    /// Make `state` the current state.  Switching states is not a
    /// structural change: cached causality of other states stays valid.
    pub fn set_current_state(&mut self, modal: EntityId, state: &str) -> Result<(), ModalError> {
        fsm_of_mut(self.workspace.graph_mut(), modal)?.set_current_state(state)?;
        debug!(modal = %self.graph().full_name(modal), state = %state, "changed state");
        Ok(())
    }

    /// Return the controller to its initial state.
    pub fn reset(&mut self, modal: EntityId) -> Result<(), ModalError> {
        fsm_of_mut(self.workspace.graph_mut(), modal)?.reset();
        Ok(())
    }

    pub fn current_state(&self, modal: EntityId) -> Result<Option<String>, ModalError> {
        Ok(self.fsm(modal)?.current_state().map(|state| state.name().to_string()))
    }

    /// Let the controller handle an error reported by a refinement, by
    /// taking its error transition out of the current state.  The error is
    /// returned when the controller has no such transition.
    pub fn handle_model_error(&mut self, modal: EntityId, error: ModalError) -> Result<(), ModalError> {
        let handled = fsm_of_mut(self.workspace.graph_mut(), modal)?.handle_error();
        if handled {
            debug!(modal = %self.graph().full_name(modal), error = %error, "controller handled error");
            Ok(())
        } else {
            Err(error)
        }
    }

    // Refinements

    /// Create a refinement of `state` from a template.  The refinement gets
    /// a copy of every port of the modal model, linked into the existing
    /// relations.  The opener, when given, is called last; its failure
    /// undoes the creation.
    pub fn add_refinement(
        &mut self,
        modal: EntityId,
        state: &str,
        name: &str,
        template: &RefinementTemplate,
        opener: Option<&mut dyn InstanceOpener>,
    ) -> Result<EntityId, ModalError> {
        let subject = format!("{}.{}", self.graph().full_name(modal), name);
        let default_last = self.config.default_last;
        self.transact("AddRefinement", &subject, |cx| {
            check_modal(cx.graph, modal)?;
            fsm_of(cx.graph, modal)?.state(state)?;
            let body = template.instantiate()?;
            let refinement = cx
                .graph
                .insert_entity(Some(modal), name, EntityKind::Refinement(body))?;
            ports::copy_ports(cx, modal, refinement)?;
            fsm_of_mut(cx.graph, modal)?.add_state_refinement(state, name)?;
            if default_last {
                order_default_last(cx.graph, modal)?;
            }
            if let Some(opener) = opener {
                opener.open(cx.graph, refinement)?;
            }
            debug!(refinement = %cx.graph.full_name(refinement), state = %state, "created refinement");
            Ok(refinement)
        })
    }

    /// Create a nested modal model as a refinement of `state`.  It gets its
    /// own controller, and mirrors the ports of the enclosing modal model.
    pub fn add_modal_refinement(&mut self, modal: EntityId, state: &str, name: &str) -> Result<EntityId, ModalError> {
        let subject = format!("{}.{}", self.graph().full_name(modal), name);
        let default_last = self.config.default_last;
        let controller_name = self.config.controller_name.clone();
        self.transact("AddModalRefinement", &subject, |cx| {
            check_modal(cx.graph, modal)?;
            fsm_of(cx.graph, modal)?.state(state)?;
            let nested = cx.graph.insert_entity(Some(modal), name, EntityKind::Modal)?;
            ports::copy_ports(cx, modal, nested)?;
            let controller = cx.graph.insert_entity(
                Some(nested),
                &controller_name,
                EntityKind::Controller(Fsm::default()),
            )?;
            ports::copy_ports(cx, nested, controller)?;
            fsm_of_mut(cx.graph, modal)?.add_state_refinement(state, name)?;
            if default_last {
                order_default_last(cx.graph, modal)?;
            }
            debug!(refinement = %cx.graph.full_name(nested), state = %state, "created modal refinement");
            Ok(nested)
        })
    }

    /// Remove a refinement, its ports, and every mention of it in the
    /// controller.
    pub fn remove_refinement(&mut self, refinement: EntityId) -> Result<(), ModalError> {
        let subject = self.graph().full_name(refinement);
        self.transact("RemoveRefinement", &subject, |cx| {
            let (name, modal, removable) = {
                let entity = cx.graph.entity(refinement)?;
                (
                    entity.name().to_string(),
                    entity.container(),
                    entity.is_refinement() || entity.is_modal(),
                )
            };
            let modal = match modal {
                Some(modal) if removable && cx.graph.entity(modal)?.is_modal() => modal,
                _ => {
                    return Err(ModalError::IllegalStructure(format!(
                        "{} is not a refinement of a modal model",
                        cx.graph.full_name(refinement)
                    )))
                }
            };
            cx.graph.remove_entity(refinement)?;
            fsm_of_mut(cx.graph, modal)?.forget_refinement(&name);
            debug!(modal = %cx.graph.full_name(modal), refinement = %name, "removed refinement");
            Ok(())
        })
    }

    /// The refinement to drop an object into for `state`: the state's first
    /// refinement, or a new one made from `template` when it has none.
    pub fn drop_object(
        &mut self,
        modal: EntityId,
        state: &str,
        template: &RefinementTemplate,
    ) -> Result<EntityId, ModalError> {
        if let Some(existing) = self.state_refinements(modal, state)?.first() {
            return Ok(*existing);
        }
        let graph = self.graph();
        let name = utils::unique_name(state, |candidate| graph.find_entity(modal, candidate).is_some());
        self.add_refinement(modal, state, &name, template, None)
    }

    /// Refinements named by no state and no transition.
    pub fn unused_refinements(&self, modal: EntityId) -> Result<Vec<EntityId>, ModalError> {
        let graph = self.graph();
        let fsm = fsm_of(graph, modal)?;
        let mut unused = Vec::new();
        for refinement in self.refinements(modal)? {
            if !fsm.refers_to(graph.entity(refinement)?.name()) {
                unused.push(refinement);
            }
        }
        Ok(unused)
    }

    /// Remove every unused refinement.  Returns how many were removed.
    pub fn remove_unused_refinements(&mut self, modal: EntityId) -> Result<usize, ModalError> {
        let unused = self.unused_refinements(modal)?;
        if unused.is_empty() {
            return Ok(0);
        }
        let subject = self.graph().full_name(modal);
        self.transact("RemoveUnusedRefinements", &subject, |cx| {
            for refinement in &unused {
                cx.graph.remove_entity(*refinement)?;
            }
            Ok(unused.len())
        })
    }

    // Parameters

    /// A parameter of an entity.  A modal model falls back to the
    /// parameters of its controller.
    pub fn parameter(&self, entity: EntityId, name: &str) -> Option<&str> {
        let graph = self.graph();
        let own = graph.entity(entity).ok()?;
        if let Some(value) = own.parameters().get(name) {
            return Some(value.as_str());
        }
        if !own.is_modal() {
            return None;
        }
        let controller = controller_of(graph, entity).ok()?;
        graph
            .entity(controller)
            .ok()?
            .parameters()
            .get(name)
            .map(String::as_str)
    }

    pub fn set_parameter(&mut self, entity: EntityId, name: &str, value: &str) -> Result<(), ModalError> {
        let subject = format!("{}:{}", self.graph().full_name(entity), name);
        self.transact("SetParameter", &subject, |cx| {
            cx.graph
                .entity_mut(entity)?
                .parameters
                .insert(name.to_string(), value.to_string());
            Ok(())
        })
    }

    // Types

    /// The type constraints a modal model imposes between its ports and the
    /// mirror ports of its children: a child's port is at least the modal
    /// model's port, and when the child's port is an output, the modal
    /// model's port is at least the child's.
    pub fn type_constraints(&self, modal: EntityId) -> Result<Vec<TypeConstraint>, ModalError> {
        let graph = self.graph();
        let entity = modal_entity(graph, modal)?;
        let mut constraints = Vec::new();
        for port in entity.ports() {
            let name = graph.port(*port)?.name();
            for child in entity.entities() {
                if let Some(mirror) = graph.find_port(*child, name) {
                    constraints.push(TypeConstraint {
                        lesser: *port,
                        greater: mirror,
                    });
                    if graph.port(mirror)?.is_output() {
                        constraints.push(TypeConstraint {
                            lesser: mirror,
                            greater: *port,
                        });
                    }
                }
            }
        }
        Ok(constraints)
    }

    // Causality

    /// The causality interface of a modal model.  With state dependent
    /// causality configured, and a current state known, the answer covers
    /// the current state only and is cached per state; otherwise it is the
    /// conservative causality of the whole composite.
    pub fn causality_interface(&self, modal: EntityId) -> Result<ModalCausality, ModalError> {
        let mut caches = self.caches.lock();
        self.modal_causality(&mut caches, modal)
    }

    /// The conservative causality of a modal model, whatever the
    /// configuration.
    pub fn conservative_causality(&self, modal: EntityId) -> Result<Arc<ActorCausality>, ModalError> {
        let mut caches = self.caches.lock();
        self.full_causality(&mut caches, modal)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.caches.lock().states.stats()
    }

    fn modal_causality(&self, caches: &mut Caches, modal: EntityId) -> Result<ModalCausality, ModalError> {
        check_modal(self.graph(), modal)?;
        if self.config.state_dependent_causality {
            if let Some(state) = fsm_of(self.graph(), modal)?.current_state() {
                return self
                    .state_causality(caches, modal, state.name())
                    .map(ModalCausality::StateDependent);
            }
        }
        self.full_causality(caches, modal)
            .map(ModalCausality::Conservative)
    }

    fn full_causality(&self, caches: &mut Caches, modal: EntityId) -> Result<Arc<ActorCausality>, ModalError> {
        let generation = self.generation();
        let key = (modal, self.nested_states(modal)?);
        if let Some(causality) = caches.composites.get(&key, generation) {
            return Ok(causality);
        }
        let causality = {
            let mut child_causality = |child: EntityId| self.entity_causality(caches, child, Scope::All);
            composite_causality(self.graph(), modal, self.default_dependency(), &mut child_causality)?
        };
        let causality = Arc::new(causality);
        debug!(
            modal = %self.graph().full_name(modal),
            generation = generation.value(),
            "computed composite causality"
        );
        caches.composites.insert(key, generation, causality.clone());
        Ok(causality)
    }

    fn state_causality(&self, caches: &mut Caches, modal: EntityId, state: &str) -> Result<Arc<MirrorCausality>, ModalError> {
        let generation = self.generation();
        let key = (modal, state.to_string(), self.nested_states(modal)?);
        if let Some(causality) = caches.states.get(&key, generation) {
            return Ok(causality);
        }
        let graph = self.graph();
        let controller = controller_of(graph, modal)?;
        let mut causality = MirrorCausality::new(
            port_signature(graph, modal)?,
            self.entity_causality(caches, controller, Scope::State(state))?,
            self.default_dependency(),
            generation,
        );
        for refinement in self.state_refinements(modal, state)? {
            causality.compose_with(self.entity_causality(caches, refinement, Scope::All)?);
        }
        let causality = Arc::new(causality);
        debug!(
            modal = %graph.full_name(modal),
            state = %state,
            generation = generation.value(),
            "computed state causality"
        );
        caches.states.insert(key, generation, causality.clone());
        Ok(causality)
    }

    /// The current state of every modal model nested anywhere below
    /// `entity`, in containment order.  Empty unless causality is state
    /// dependent.
    fn nested_states(&self, entity: EntityId) -> Result<NestedStates, ModalError> {
        let mut states = Vec::new();
        if !self.config.state_dependent_causality {
            return Ok(states);
        }
        let graph = self.graph();
        let mut pending: Vec<EntityId> = graph.entity(entity)?.entities().iter().rev().copied().collect();
        while let Some(child) = pending.pop() {
            let child_entity = graph.entity(child)?;
            if !child_entity.is_modal() {
                continue;
            }
            if let Some(state) = fsm_of(graph, child)?.current_state() {
                states.push((child, state.name().to_string()));
            }
            pending.extend(child_entity.entities().iter().rev().copied());
        }
        Ok(states)
    }

    fn entity_causality(&self, caches: &mut Caches, entity: EntityId, scope: Scope<'_>) -> Result<SharedCausality, ModalError> {
        let graph = self.graph();
        let default = self.default_dependency();
        match graph.entity(entity)?.kind() {
            EntityKind::Controller(fsm) => {
                let signature = port_signature(graph, entity)?;
                Ok(Arc::new(fsm.causality(&signature, default, scope)?))
            }
            EntityKind::Refinement(body) => {
                let signature = port_signature(graph, entity)?;
                Ok(Arc::new(body.actor().causality(&signature, default)))
            }
            EntityKind::Modal => Ok(self.modal_causality(caches, entity)?.shared()),
        }
    }

    // Change requests

    /// Queue a change request for `execute_change_requests`.
    pub fn request_change(&mut self, request: ChangeRequest) {
        self.pending.push(request);
    }

    pub fn pending_changes(&self) -> &[ChangeRequest] {
        &self.pending
    }

    pub fn add_change_listener(&mut self, listener: Box<dyn ChangeListener>) {
        self.listeners.push(listener);
    }

    /// Execute the queued change requests in order, each as its own
    /// transaction.  Listeners hear about every success and failure.
    /// Without listeners, the first failure is returned once the queue has
    /// been worked through.  Returns the number of successful requests.
    pub fn execute_change_requests(&mut self) -> Result<usize, ModalError> {
        let pending = std::mem::take(&mut self.pending);
        let mut executed = 0;
        let mut first_error = None;
        for request in pending {
            match request.execute(self) {
                Ok(()) => {
                    executed += 1;
                    debug!(request = %request.label(), "executed change request");
                    for listener in self.listeners.iter_mut() {
                        listener.change_executed(&request);
                    }
                }
                Err(error) => {
                    warn!(request = %request.label(), error = %error, "change request failed");
                    for listener in self.listeners.iter_mut() {
                        listener.change_failed(&request, &error);
                    }
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }
        match first_error {
            Some(error) if self.listeners.is_empty() => Err(error),
            _ => Ok(executed),
        }
    }

    /// Put back the structure of an earlier clone.  The generation keeps
    /// advancing, so nothing cached since the clone is reused.
    pub(crate) fn restore_from(&mut self, snapshot: ModalModel) {
        self.workspace.restore(snapshot.workspace.graph().clone());
        self.workspace.mutated();
        self.records = snapshot.records;
    }

    // Persistence

    pub fn to_document(&self) -> Result<ModelDocument, ModalError> {
        ModelDocument::from_model(self.graph(), self.root, &self.config)
    }

    /// Build a model from a document.  The build is a single edit.
    pub fn from_document(document: &ModelDocument) -> Result<Self, ModalError> {
        let mut model = ModalModel::with_config(&document.model.name, document.config.clone())?;
        let root = model.root;
        let subject = model.graph().full_name(root);
        let default_last = model.config.default_last;
        model.transact("Load", &subject, |cx| document.model.load_into(cx, root, default_last))?;
        model.records.clear();
        Ok(model)
    }

    pub fn to_yaml(&self) -> Result<String, ModalError> {
        Ok(serde_yaml::to_string(&self.to_document()?)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ModalError> {
        Self::from_document(&serde_yaml::from_str(yaml)?)
    }

    pub fn to_json(&self) -> Result<String, ModalError> {
        Ok(serde_json::to_string_pretty(&self.to_document()?)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ModalError> {
        Self::from_document(&serde_json::from_str(json)?)
    }
}

impl Clone for ModalModel {
    /// A clone has a cold causality cache, no queued change requests and no
    /// listeners.
    fn clone(&self) -> Self {
        Self {
            workspace: self.workspace.clone(),
            root: self.root,
            config: self.config.clone(),
            mirror_disabled: BTreeSet::new(),
            caches: Mutex::new(Caches::default()),
            records: self.records.clone(),
            pending: Vec::new(),
            listeners: Vec::new(),
        }
    }
}

impl Reportable for ModalModel {
    fn status(&self) -> String {
        let refinements = self.refinements(self.root).map_or(0, |refinements| refinements.len());
        let state = self
            .current_state(self.root)
            .ok()
            .flatten()
            .unwrap_or_else(|| String::from("no state"));
        format!(
            "{} refinements, in {}, at generation {}",
            refinements,
            state,
            self.generation().value()
        )
    }

    fn records(&self) -> &Vec<EditRecord> {
        &self.records
    }
}

impl Serialize for ModalModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document()
            .map_err(ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ModalModel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = ModelDocument::deserialize(deserializer)?;
        ModalModel::from_document(&document).map_err(de::Error::custom)
    }
}

fn modal_entity(graph: &Graph, modal: EntityId) -> Result<&crate::kernel::Entity, ModalError> {
    let entity = graph.entity(modal)?;
    if entity.is_modal() {
        Ok(entity)
    } else {
        Err(ModalError::NotModalContainer(graph.full_name(modal)))
    }
}

fn check_modal(graph: &Graph, modal: EntityId) -> Result<(), ModalError> {
    modal_entity(graph, modal).map(|_| ())
}

pub(crate) fn controller_of(graph: &Graph, modal: EntityId) -> Result<EntityId, ModalError> {
    for child in modal_entity(graph, modal)?.entities() {
        if graph.entity(*child)?.is_controller() {
            return Ok(*child);
        }
    }
    Err(ModalError::IllegalStructure(format!(
        "{} has no controller",
        graph.full_name(modal)
    )))
}

fn fsm_of(graph: &Graph, modal: EntityId) -> Result<&Fsm, ModalError> {
    let controller = controller_of(graph, modal)?;
    graph
        .entity(controller)?
        .fsm()
        .ok_or_else(|| ModalError::InternalError(format!("{} is not a controller", graph.full_name(controller))))
}

fn fsm_of_mut(graph: &mut Graph, modal: EntityId) -> Result<&mut Fsm, ModalError> {
    let controller = controller_of(graph, modal)?;
    let name = graph.full_name(controller);
    graph
        .entity_mut(controller)?
        .fsm_mut()
        .ok_or_else(|| ModalError::InternalError(format!("{} is not a controller", name)))
}

/// Keep the refinement named `default` last among the modal model's
/// children.
pub(crate) fn order_default_last(graph: &mut Graph, modal: EntityId) -> Result<(), ModalError> {
    if let Some(default) = graph.find_entity(modal, "default") {
        graph.move_entity_to_last(default)?;
    }
    Ok(())
}
