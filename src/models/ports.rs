//! Port creation.  New ports are mirrored the same way edits are: a request
//! made on a refinement or controller is forwarded to the enclosing modal
//! model, which creates its own port and then one on each of its children.
//! Children are created with their mirroring disabled, which is what stops
//! them from forwarding the request back up.

use tracing::debug;

use crate::kernel::relation::relation_name;
use crate::kernel::{EntityId, Port, PortId, PortSpec, RelationId};
use crate::mirror::{modal_container, promote_controller_input, EditContext};
use crate::utils::errors::ModalError;

/// Create a port named `name` on `entity`, and on every other member of
/// the mirror group it joins.  Returns the port created on `entity`.
pub(crate) fn new_port(cx: &mut EditContext<'_>, entity: EntityId, name: &str) -> Result<PortId, ModalError> {
    if cx.graph.find_port(entity, name).is_some() {
        return Err(ModalError::NameDuplication {
            container: cx.graph.full_name(entity),
            name: name.to_string(),
        });
    }
    let container = modal_container(cx.graph, entity);
    let disabled = cx.is_disabled(entity);

    if cx.graph.entity(entity)?.is_modal() {
        if let (Some(parent), false) = (container, disabled) {
            if cx.graph.find_port(parent, name).is_none() {
                new_port(cx, parent, name)?;
                return local_port(cx, entity, name);
            }
        }
        let port = insert_linked(cx, entity, Port::new(name, entity))?;
        let children = cx.graph.entity(entity)?.entities.clone();
        for child in children {
            if cx.graph.find_port(child, name).is_none() {
                cx.with_disabled(child, |cx| new_port(cx, child, name))?;
            }
        }
        debug!(entity = %cx.graph.full_name(entity), port = %name, "created mirrored port");
        return Ok(port);
    }

    match container {
        Some(parent) if !disabled && cx.graph.find_port(parent, name).is_none() => {
            new_port(cx, parent, name)?;
            local_port(cx, entity, name)
        }
        _ => insert_linked(cx, entity, Port::new(name, entity)),
    }
}

/// Create a port described by `spec` on `entity` and its mirror group, then
/// apply the flags and values of the spec through the mirrored edits.
pub(crate) fn new_port_with(cx: &mut EditContext<'_>, entity: EntityId, spec: &PortSpec) -> Result<PortId, ModalError> {
    use crate::mirror::{propagate, Direction, PortEdit};
    use std::collections::BTreeSet;

    let port = new_port(cx, entity, &spec.name)?;
    let mut edits = Vec::new();
    if spec.input {
        edits.push(PortEdit::Input(true));
    }
    if spec.output {
        edits.push(PortEdit::Output(true));
    }
    if spec.multiport {
        edits.push(PortEdit::Multiport(true));
    }
    if spec.declared_type.is_some() {
        edits.push(PortEdit::DeclaredType(spec.declared_type.clone()));
    }
    if spec.default_value.is_some() {
        edits.push(PortEdit::DefaultValue(spec.default_value.clone()));
    }
    for edit in edits {
        propagate(cx, port, &edit, Direction::None, &mut BTreeSet::new())?;
    }
    Ok(port)
}

/// Add an existing port description to an entity outside of the mirrored
/// creation protocol, as pasting does.  A refinement or controller only
/// accepts a port its modal model already has, and the port takes the
/// modal model's flags.
pub(crate) fn add_port(cx: &mut EditContext<'_>, entity: EntityId, spec: &PortSpec) -> Result<PortId, ModalError> {
    if cx.graph.entity(entity)?.is_modal() {
        return new_port_with(cx, entity, spec);
    }
    match modal_container(cx.graph, entity) {
        Some(parent) => match cx.graph.find_port(parent, &spec.name) {
            Some(existing) => {
                let spec = cx.graph.port(existing)?.spec();
                copy_port(cx, entity, &spec)
            }
            None => Err(ModalError::PortOutsideProtocol {
                entity: cx.graph.full_name(entity),
                port: spec.name.clone(),
            }),
        },
        None => {
            let port = Port::from_spec(spec, entity);
            insert_linked(cx, entity, port)
        }
    }
}

/// Copy a port description onto `entity` without mirroring, linking it into
/// the relations of its container.  A nested modal model gets its own
/// relation for the port as well.
pub(crate) fn copy_port(cx: &mut EditContext<'_>, entity: EntityId, spec: &PortSpec) -> Result<PortId, ModalError> {
    let mut port = Port::from_spec(spec, entity);
    if cx.graph.entity(entity)?.is_controller() {
        promote_controller_input(&mut port);
    }
    insert_linked(cx, entity, port)
}

/// Copy every port of `modal`, in order, onto `entity`, with the mirroring
/// of `entity` disabled for the duration.
pub(crate) fn copy_ports(cx: &mut EditContext<'_>, modal: EntityId, entity: EntityId) -> Result<(), ModalError> {
    let specs = cx
        .graph
        .entity(modal)?
        .ports
        .iter()
        .map(|port| cx.graph.port(*port).map(|port| port.spec()))
        .collect::<Result<Vec<PortSpec>, ModalError>>()?;
    cx.with_disabled(entity, |cx| {
        for spec in &specs {
            if cx.graph.find_port(entity, &spec.name).is_none() {
                copy_port(cx, entity, spec)?;
            }
        }
        Ok(())
    })
}

/// The port on `entity` that a delegated creation has just produced.
fn local_port(cx: &EditContext<'_>, entity: EntityId, name: &str) -> Result<PortId, ModalError> {
    cx.graph.find_port(entity, name).ok_or_else(|| {
        ModalError::InternalError(format!(
            "port \"{}\" was not mirrored onto {}",
            name,
            cx.graph.full_name(entity)
        ))
    })
}

/// Insert a port and link it: into the `<name>Relation` of the enclosing
/// modal model, together with that model's port, and for a modal model
/// into its own `<name>Relation`.
fn insert_linked(cx: &mut EditContext<'_>, entity: EntityId, port: Port) -> Result<PortId, ModalError> {
    let name = port.name.clone();
    let port = cx.graph.insert_port(entity, port)?;
    cx.touched.push(port);
    if let Some(parent) = modal_container(cx.graph, entity) {
        let relation = relation_for(cx, parent, &name)?;
        if let Some(parent_port) = cx.graph.find_port(parent, &name) {
            cx.graph.link(relation, parent_port)?;
        }
        cx.graph.link(relation, port)?;
    }
    if cx.graph.entity(entity)?.is_modal() {
        let relation = relation_for(cx, entity, &name)?;
        cx.graph.link(relation, port)?;
    }
    Ok(port)
}

fn relation_for(cx: &mut EditContext<'_>, modal: EntityId, port_name: &str) -> Result<RelationId, ModalError> {
    let name = relation_name(port_name);
    match cx.graph.find_relation(modal, &name) {
        Some(relation) => Ok(relation),
        None => cx.graph.insert_relation(modal, &name),
    }
}
