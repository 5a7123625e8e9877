use slab::Slab;

use super::entity::{Entity, EntityKind};
use super::port::Port;
use super::relation::{Relation, Width};
use super::{EntityId, Move, PortId, RelationId};
use crate::utils::errors::ModalError;

/// The `Graph` is the arena holding every entity, port, and relation of a
/// model.  It enforces containment and naming rules only; the mirroring
/// protocol is layered on top of it.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    entities: Slab<Entity>,
    ports: Slab<Port>,
    relations: Slab<Relation>,
}

impl Graph {
    pub fn entity(&self, id: EntityId) -> Result<&Entity, ModalError> {
        self.entities
            .get(id.0)
            .ok_or_else(|| ModalError::EntityNotFound(format!("#{}", id.0)))
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, ModalError> {
        self.entities
            .get_mut(id.0)
            .ok_or_else(|| ModalError::EntityNotFound(format!("#{}", id.0)))
    }

    pub fn port(&self, id: PortId) -> Result<&Port, ModalError> {
        self.ports
            .get(id.0)
            .ok_or_else(|| ModalError::PortNotFound(format!("#{}", id.0)))
    }

    pub(crate) fn port_mut(&mut self, id: PortId) -> Result<&mut Port, ModalError> {
        self.ports
            .get_mut(id.0)
            .ok_or_else(|| ModalError::PortNotFound(format!("#{}", id.0)))
    }

    pub fn relation(&self, id: RelationId) -> Result<&Relation, ModalError> {
        self.relations
            .get(id.0)
            .ok_or_else(|| ModalError::InternalError(format!("missing relation #{}", id.0)))
    }

    fn relation_mut(&mut self, id: RelationId) -> Result<&mut Relation, ModalError> {
        self.relations
            .get_mut(id.0)
            .ok_or_else(|| ModalError::InternalError(format!("missing relation #{}", id.0)))
    }

    pub fn contains_port(&self, id: PortId) -> bool {
        self.ports.contains(id.0)
    }

    pub fn find_port(&self, entity: EntityId, name: &str) -> Option<PortId> {
        self.entities.get(entity.0)?.ports.iter().copied().find(|id| {
            self.ports
                .get(id.0)
                .map_or(false, |port| port.name == name)
        })
    }

    pub fn find_entity(&self, container: EntityId, name: &str) -> Option<EntityId> {
        self.entities
            .get(container.0)?
            .entities
            .iter()
            .copied()
            .find(|id| {
                self.entities
                    .get(id.0)
                    .map_or(false, |entity| entity.name == name)
            })
    }

    pub fn find_relation(&self, container: EntityId, name: &str) -> Option<RelationId> {
        self.entities
            .get(container.0)?
            .relations
            .iter()
            .copied()
            .find(|id| {
                self.relations
                    .get(id.0)
                    .map_or(false, |relation| relation.name == name)
            })
    }

    /// The dotted name of an entity, from the top of its tree.
    pub fn full_name(&self, entity: EntityId) -> String {
        let mut names = Vec::new();
        let mut current = Some(entity);
        while let Some(id) = current {
            match self.entities.get(id.0) {
                Some(entity) => {
                    names.push(entity.name.clone());
                    current = entity.container;
                }
                None => break,
            }
        }
        names.reverse();
        format!(".{}", names.join("."))
    }

    pub fn port_full_name(&self, port: PortId) -> String {
        match self.ports.get(port.0) {
            Some(port) => format!("{}.{}", self.full_name(port.container), port.name),
            None => format!("#{}", port.0),
        }
    }

    pub(crate) fn insert_entity(
        &mut self,
        container: Option<EntityId>,
        name: &str,
        kind: EntityKind,
    ) -> Result<EntityId, ModalError> {
        if let Some(container) = container {
            self.entity(container)?;
            if self.find_entity(container, name).is_some() {
                return Err(ModalError::NameDuplication {
                    container: self.full_name(container),
                    name: name.to_string(),
                });
            }
        }
        let id = EntityId(self.entities.insert(Entity::new(name, container, kind)));
        if let Some(container) = container {
            self.entity_mut(container)?.entities.push(id);
        }
        Ok(id)
    }

    /// Remove an entity with everything it contains.  Ports are unlinked
    /// first, so relations outside the entity that only served it go too.
    pub(crate) fn remove_entity(&mut self, id: EntityId) -> Result<Entity, ModalError> {
        let children = self.entity(id)?.entities.clone();
        for child in children {
            self.remove_entity(child)?;
        }
        let ports = self.entity(id)?.ports.clone();
        for port in ports {
            self.remove_port(port)?;
        }
        let relations = self.entity(id)?.relations.clone();
        for relation in relations {
            self.remove_relation(relation)?;
        }
        if let Some(container) = self.entity(id)?.container {
            self.entity_mut(container)?
                .entities
                .retain(|entity| *entity != id);
        }
        Ok(self.entities.remove(id.0))
    }

    pub(crate) fn move_entity_to_last(&mut self, id: EntityId) -> Result<(), ModalError> {
        if let Some(container) = self.entity(id)?.container {
            let entities = &mut self.entity_mut(container)?.entities;
            entities.retain(|entity| *entity != id);
            entities.push(id);
        }
        Ok(())
    }

    pub(crate) fn insert_port(&mut self, entity: EntityId, mut port: Port) -> Result<PortId, ModalError> {
        self.entity(entity)?;
        if self.find_port(entity, &port.name).is_some() {
            return Err(ModalError::NameDuplication {
                container: self.full_name(entity),
                name: port.name,
            });
        }
        port.container = entity;
        port.relations.clear();
        let id = PortId(self.ports.insert(port));
        self.entity_mut(entity)?.ports.push(id);
        Ok(id)
    }

    /// Remove a port, unlinking it first.  A relation left with no linked
    /// port is removed with it.
    pub(crate) fn remove_port(&mut self, id: PortId) -> Result<Port, ModalError> {
        let relations = self.port(id)?.relations.clone();
        for relation in relations {
            self.unlink(relation, id)?;
            if self.relation(relation)?.ports.is_empty() {
                self.remove_relation(relation)?;
            }
        }
        let container = self.port(id)?.container;
        self.entity_mut(container)?.ports.retain(|port| *port != id);
        Ok(self.ports.remove(id.0))
    }

    pub(crate) fn rename_port(&mut self, id: PortId, name: &str) -> Result<(), ModalError> {
        let container = self.port(id)?.container;
        if let Some(existing) = self.find_port(container, name) {
            if existing != id {
                return Err(ModalError::NameDuplication {
                    container: self.full_name(container),
                    name: name.to_string(),
                });
            }
        }
        self.port_mut(id)?.name = name.to_string();
        Ok(())
    }

    /// Reorder a port within its container.  Returns the index the port had
    /// before moving, or `None` when it did not move.
    pub(crate) fn move_port(&mut self, id: PortId, to: Move) -> Result<Option<usize>, ModalError> {
        let container = self.port(id)?.container;
        let ports = &mut self.entity_mut(container)?.ports;
        let len = ports.len();
        let index = ports
            .iter()
            .position(|port| *port == id)
            .ok_or_else(|| ModalError::InternalError(format!("port #{} not listed in its container", id.0)))?;
        let target = match to {
            Move::Up => index.checked_sub(1),
            Move::Down if index + 1 < len => Some(index + 1),
            Move::Down => None,
            Move::First => Some(0),
            Move::Last => Some(len - 1),
            Move::Index(target) if target >= len => {
                return Err(ModalError::IndexOutOfRange { index: target, len })
            }
            Move::Index(target) => Some(target),
        };
        match target {
            Some(target) if target != index => {
                let port = ports.remove(index);
                ports.insert(target, port);
                Ok(Some(index))
            }
            _ => Ok(None),
        }
    }

    pub(crate) fn insert_relation(&mut self, container: EntityId, name: &str) -> Result<RelationId, ModalError> {
        self.entity(container)?;
        if self.find_relation(container, name).is_some() {
            return Err(ModalError::NameDuplication {
                container: self.full_name(container),
                name: name.to_string(),
            });
        }
        let id = RelationId(self.relations.insert(Relation::new(name, container)));
        self.entity_mut(container)?.relations.push(id);
        Ok(id)
    }

    pub(crate) fn remove_relation(&mut self, id: RelationId) -> Result<Relation, ModalError> {
        let ports = self.relation(id)?.ports.clone();
        for port in ports {
            if let Ok(port) = self.port_mut(port) {
                port.relations.retain(|relation| *relation != id);
            }
        }
        let container = self.relation(id)?.container;
        self.entity_mut(container)?
            .relations
            .retain(|relation| *relation != id);
        Ok(self.relations.remove(id.0))
    }

    pub(crate) fn rename_relation(&mut self, id: RelationId, name: &str) -> Result<(), ModalError> {
        let container = self.relation(id)?.container;
        if self.find_relation(container, name).is_some() {
            return Err(ModalError::NameDuplication {
                container: self.full_name(container),
                name: name.to_string(),
            });
        }
        self.relation_mut(id)?.name = name.to_string();
        Ok(())
    }

    /// Link a port to a relation.  Linking twice is a no-op.  Relations
    /// linked to a multiport infer their width.
    pub(crate) fn link(&mut self, relation: RelationId, port: PortId) -> Result<(), ModalError> {
        let multiport = self.port(port)?.multiport;
        let linked = self.relation(relation)?.ports.contains(&port);
        if !linked {
            self.relation_mut(relation)?.ports.push(port);
            self.port_mut(port)?.relations.push(relation);
        }
        if multiport {
            self.relation_mut(relation)?.width = Width::Infer;
        }
        Ok(())
    }

    pub(crate) fn unlink(&mut self, relation: RelationId, port: PortId) -> Result<(), ModalError> {
        self.relation_mut(relation)?.ports.retain(|linked| *linked != port);
        self.port_mut(port)?.relations.retain(|linked| *linked != relation);
        Ok(())
    }

    pub(crate) fn set_relation_width(&mut self, relation: RelationId, width: Width) -> Result<(), ModalError> {
        self.relation_mut(relation)?.width = width;
        Ok(())
    }
}
