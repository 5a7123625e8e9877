use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::config::{default_controller_name, ModalConfig};
use super::controller::Fsm;
use super::modal_model::order_default_last;
use super::ports;
use super::refinement::RefinementBody;
use crate::kernel::{EntityId, EntityKind, Graph, PortSpec};
use crate::mirror::EditContext;
use crate::utils::errors::ModalError;

/// The persisted form of a modal model: its configuration and its
/// structure.  Transient state (the causality cache, mirror disabling,
/// queued change requests) is not part of it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDocument {
    #[serde(default)]
    pub config: ModalConfig,
    pub model: ModalDocument,
}

/// A modal model, top level or nested.  Ports are listed once, on the
/// modal model; the controller and the refinements mirror them.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalDocument {
    pub name: String,
    #[serde(default)]
    pub ports: Vec<PortSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub controller: ControllerDocument,
    #[serde(default)]
    pub refinements: Vec<RefinementDocument>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerDocument {
    #[serde(default = "default_controller_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub fsm: Fsm,
}

impl Default for ControllerDocument {
    fn default() -> Self {
        Self {
            name: default_controller_name(),
            parameters: BTreeMap::new(),
            fsm: Fsm::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RefinementDocument {
    Actor {
        name: String,
        actor: RefinementBody,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        parameters: BTreeMap<String, String>,
    },
    Modal(ModalDocument),
}

impl ModelDocument {
    pub(crate) fn from_model(graph: &Graph, root: EntityId, config: &ModalConfig) -> Result<Self, ModalError> {
        Ok(Self {
            config: config.clone(),
            model: ModalDocument::from_graph(graph, root)?,
        })
    }
}

impl ModalDocument {
    fn from_graph(graph: &Graph, modal: EntityId) -> Result<Self, ModalError> {
        let entity = graph.entity(modal)?;
        let ports = entity
            .ports()
            .iter()
            .map(|port| graph.port(*port).map(|port| port.spec()))
            .collect::<Result<Vec<PortSpec>, ModalError>>()?;
        let mut controller = None;
        let mut refinements = Vec::new();
        for child in entity.entities() {
            let child_entity = graph.entity(*child)?;
            match child_entity.kind() {
                EntityKind::Controller(fsm) => {
                    controller = Some(ControllerDocument {
                        name: child_entity.name().to_string(),
                        parameters: child_entity.parameters().clone(),
                        fsm: fsm.clone(),
                    });
                }
                EntityKind::Refinement(body) => refinements.push(RefinementDocument::Actor {
                    name: child_entity.name().to_string(),
                    actor: body.clone(),
                    parameters: child_entity.parameters().clone(),
                }),
                EntityKind::Modal => refinements.push(RefinementDocument::Modal(ModalDocument::from_graph(graph, *child)?)),
            }
        }
        Ok(Self {
            name: entity.name().to_string(),
            ports,
            parameters: entity.parameters().clone(),
            controller: controller.ok_or_else(|| {
                ModalError::IllegalStructure(format!("{} has no controller", graph.full_name(modal)))
            })?,
            refinements,
        })
    }

    /// Build the content of this document into the existing modal entity
    /// `modal`.  The controller is reused when the entity already has one.
    /// A nested modal model must list exactly the ports of its container.
    pub(crate) fn load_into(
        &self,
        cx: &mut EditContext<'_>,
        modal: EntityId,
        default_last: bool,
    ) -> Result<(), ModalError> {
        for spec in &self.ports {
            ports::copy_port(cx, modal, spec)?;
        }
        cx.graph.entity_mut(modal)?.parameters = self.parameters.clone();

        let existing = cx
            .graph
            .entity(modal)?
            .entities()
            .iter()
            .copied()
            .find(|child| cx.graph.entity(*child).map_or(false, |entity| entity.is_controller()));
        let controller = match existing {
            Some(controller) => controller,
            None => cx.graph.insert_entity(
                Some(modal),
                &self.controller.name,
                EntityKind::Controller(Fsm::default()),
            )?,
        };
        {
            let entity = cx.graph.entity_mut(controller)?;
            entity.name = self.controller.name.clone();
            entity.parameters = self.controller.parameters.clone();
            entity.kind = EntityKind::Controller(self.controller.fsm.clone());
        }
        ports::copy_ports(cx, modal, controller)?;

        for refinement in &self.refinements {
            match refinement {
                RefinementDocument::Actor {
                    name,
                    actor,
                    parameters,
                } => {
                    let child = cx
                        .graph
                        .insert_entity(Some(modal), name, EntityKind::Refinement(actor.clone()))?;
                    cx.graph.entity_mut(child)?.parameters = parameters.clone();
                    ports::copy_ports(cx, modal, child)?;
                }
                RefinementDocument::Modal(nested) => {
                    let child = cx.graph.insert_entity(Some(modal), &nested.name, EntityKind::Modal)?;
                    nested.load_into(cx, child, default_last)?;
                    check_mirrored(cx.graph, modal, child)?;
                }
            }
        }
        if default_last {
            order_default_last(cx.graph, modal)?;
        }
        Ok(())
    }
}

fn port_names(graph: &Graph, entity: EntityId) -> Result<BTreeSet<&str>, ModalError> {
    graph
        .entity(entity)?
        .ports()
        .iter()
        .map(|port| graph.port(*port).map(|port| port.name()))
        .collect()
}

/// A loaded nested modal model has the same port names as its container.
fn check_mirrored(graph: &Graph, modal: EntityId, nested: EntityId) -> Result<(), ModalError> {
    let outer = port_names(graph, modal)?;
    let inner = port_names(graph, nested)?;
    if outer == inner {
        return Ok(());
    }
    let missing: Vec<&str> = outer.difference(&inner).copied().collect();
    let extra: Vec<&str> = inner.difference(&outer).copied().collect();
    Err(ModalError::IllegalStructure(format!(
        "{} does not mirror the ports of {} (missing {:?}, extra {:?})",
        graph.full_name(nested),
        graph.full_name(modal),
        missing,
        extra
    )))
}
