use std::collections::BTreeMap;

use super::{EntityId, PortId, RelationId};
use crate::models::controller::Fsm;
use crate::models::refinement::RefinementBody;

/// What an entity is, together with the data only that kind carries.
#[derive(Clone, Debug)]
pub enum EntityKind {
    /// A modal model.  Nested modal models act as refinements of the
    /// enclosing modal model and mirror its ports.
    Modal,
    /// The finite state machine controlling a modal model.
    Controller(Fsm),
    /// A refinement, whose behavior is given by a refinement actor.
    Refinement(RefinementBody),
}

/// An `Entity` is a named node of the containment tree.  It holds ordered,
/// name-unique lists of ports, child entities, and relations.
#[derive(Clone, Debug)]
pub struct Entity {
    pub(crate) name: String,
    pub(crate) container: Option<EntityId>,
    pub(crate) ports: Vec<PortId>,
    pub(crate) entities: Vec<EntityId>,
    pub(crate) relations: Vec<RelationId>,
    pub(crate) kind: EntityKind,
    pub(crate) parameters: BTreeMap<String, String>,
}

impl Entity {
    pub(crate) fn new(name: &str, container: Option<EntityId>, kind: EntityKind) -> Self {
        Self {
            name: name.to_string(),
            container,
            ports: Vec::new(),
            entities: Vec::new(),
            relations: Vec::new(),
            kind,
            parameters: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container(&self) -> Option<EntityId> {
        self.container
    }

    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn relations(&self) -> &[RelationId] {
        &self.relations
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn is_modal(&self) -> bool {
        matches!(self.kind, EntityKind::Modal)
    }

    pub fn is_controller(&self) -> bool {
        matches!(self.kind, EntityKind::Controller(_))
    }

    /// Refinements are either refinement actors or nested modal models
    /// that sit beside the controller.
    pub fn is_refinement(&self) -> bool {
        matches!(self.kind, EntityKind::Refinement(_))
    }

    pub fn fsm(&self) -> Option<&Fsm> {
        match &self.kind {
            EntityKind::Controller(fsm) => Some(fsm),
            _ => None,
        }
    }

    pub(crate) fn fsm_mut(&mut self) -> Option<&mut Fsm> {
        match &mut self.kind {
            EntityKind::Controller(fsm) => Some(fsm),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&RefinementBody> {
        match &self.kind {
            EntityKind::Refinement(body) => Some(body),
            _ => None,
        }
    }
}
