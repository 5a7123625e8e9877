//! The mirror module keeps the ports of a mirror group synchronized.  A
//! mirror group is the set of same-named ports across a modal model, its
//! controller, and its refinements (recursively, through nested modal
//! models).
//!
//! Every edit follows the same two-phase protocol.  An edit issued by the
//! user (`Direction::None`) or arriving from below (`Direction::Upward`) is
//! handed to the mirror parent port, when there is one.  The port with no
//! mirror parent is the root of the group: it applies the edit and hands it
//! `Direction::Downward` to its mirror children, which apply it and keep
//! going down.  Downward traffic never turns upward again, and a visited set
//! guarantees each port applies an edit at most once, so an edit touches
//! every member of the group exactly once.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::kernel::relation::relation_name;
use crate::kernel::{EntityId, EntityKind, Graph, Move, PortId, Width};
use crate::utils::errors::ModalError;

/// Which way an edit is travelling through the containment hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// The edit was issued on this port by the user.
    None,
    /// The edit arrived from a mirror child, and continues to the root.
    Upward,
    /// The edit arrived from the mirror parent, and continues to the leaves.
    Downward,
}

/// A structural edit of one port, mirrored across its group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PortEdit {
    Input(bool),
    Output(bool),
    Multiport(bool),
    Rename(String),
    Remove,
    Move(Move),
    DeclaredType(Option<String>),
    DefaultValue(Option<String>),
}

impl PortEdit {
    /// A short label for logs and edit records.
    pub fn label(&self) -> String {
        match self {
            PortEdit::Input(value) => format!("SetInput({})", value),
            PortEdit::Output(value) => format!("SetOutput({})", value),
            PortEdit::Multiport(value) => format!("SetMultiport({})", value),
            PortEdit::Rename(name) => format!("Rename({})", name),
            PortEdit::Remove => String::from("Remove"),
            PortEdit::Move(to) => format!("Move({:?})", to),
            PortEdit::DeclaredType(_) => String::from("SetType"),
            PortEdit::DefaultValue(_) => String::from("SetDefaultValue"),
        }
    }
}

/// The resolved members of a mirror group.  `owner` is the outermost modal
/// model of the group, and `members` starts with its port, followed by the
/// other members in containment order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorGroup {
    pub owner: EntityId,
    pub members: Vec<PortId>,
}

impl MirrorGroup {
    pub fn root(&self) -> Option<PortId> {
        self.members.first().copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, port: PortId) -> bool {
        self.members.contains(&port)
    }
}

/// The mutable state threaded through a structural edit: the graph being
/// edited, the entities whose mirroring is disabled, and the ports touched
/// so far.
pub(crate) struct EditContext<'a> {
    pub(crate) graph: &'a mut Graph,
    pub(crate) disabled: &'a mut BTreeSet<EntityId>,
    pub(crate) touched: Vec<PortId>,
}

impl<'a> EditContext<'a> {
    pub(crate) fn new(graph: &'a mut Graph, disabled: &'a mut BTreeSet<EntityId>) -> Self {
        Self {
            graph,
            disabled,
            touched: Vec::new(),
        }
    }

    pub(crate) fn is_disabled(&self, entity: EntityId) -> bool {
        self.disabled.contains(&entity)
    }

    /// Run `action` with mirroring disabled for `entity`.  The prior state
    /// is restored whether or not the action succeeds.
    pub(crate) fn with_disabled<T, F>(&mut self, entity: EntityId, action: F) -> Result<T, ModalError>
    where
        F: FnOnce(&mut Self) -> Result<T, ModalError>,
    {
        let inserted = self.disabled.insert(entity);
        let result = action(self);
        if inserted {
            self.disabled.remove(&entity);
        }
        result
    }
}

/// The modal model directly enclosing `entity`, when the entity mirrors its
/// ports.
pub fn modal_container(graph: &Graph, entity: EntityId) -> Option<EntityId> {
    let container = graph.entity(entity).ok()?.container?;
    if graph.entity(container).ok()?.is_modal() {
        Some(container)
    } else {
        None
    }
}

/// The same-named port on the enclosing modal model.
pub fn mirror_parent(graph: &Graph, port: PortId) -> Result<Option<PortId>, ModalError> {
    let port = graph.port(port)?;
    Ok(modal_container(graph, port.container)
        .and_then(|modal| graph.find_port(modal, &port.name)))
}

/// The same-named ports on the entities a modal model contains.  Ports of
/// non-modal entities have no mirror children.
pub fn mirror_children(graph: &Graph, port: PortId) -> Result<Vec<PortId>, ModalError> {
    let port = graph.port(port)?;
    let entity = graph.entity(port.container)?;
    if !entity.is_modal() {
        return Ok(Vec::new());
    }
    Ok(entity
        .entities
        .iter()
        .filter_map(|child| graph.find_port(*child, &port.name))
        .collect())
}

/// Resolve the mirror group `port` belongs to.
pub fn resolve_group(graph: &Graph, port: PortId) -> Result<MirrorGroup, ModalError> {
    let mut root = port;
    while let Some(parent) = mirror_parent(graph, root)? {
        root = parent;
    }
    let mut members = Vec::new();
    let mut pending = vec![root];
    while let Some(member) = pending.pop() {
        members.push(member);
        let mut children = mirror_children(graph, member)?;
        children.reverse();
        pending.extend(children);
    }
    Ok(MirrorGroup {
        owner: graph.port(root)?.container,
        members,
    })
}

/// Apply `edit` to the mirror group of `port`, travelling in `direction`.
/// Returns the number of ports the edit was applied to.
pub(crate) fn propagate(
    cx: &mut EditContext<'_>,
    port: PortId,
    edit: &PortEdit,
    direction: Direction,
    visited: &mut BTreeSet<PortId>,
) -> Result<usize, ModalError> {
    let (container, automatically_input) = {
        let port = cx.graph.port(port)?;
        (port.container, port.automatically_input)
    };
    match direction {
        Direction::None if cx.is_disabled(container) => apply_downward(cx, port, edit, visited),
        Direction::None if automatically_input && matches!(edit, PortEdit::Input(_)) => {
            // The input flag of this port was derived from a refinement
            // output; an explicit change to it stays local.
            if visited.insert(port) {
                if let PortEdit::Input(value) = edit {
                    cx.touched.push(port);
                    cx.graph.port_mut(port)?.input = *value;
                }
                Ok(1)
            } else {
                Ok(0)
            }
        }
        Direction::None | Direction::Upward => match mirror_parent(cx.graph, port)? {
            Some(parent) => {
                trace!(
                    port = %cx.graph.port_full_name(port),
                    parent = %cx.graph.port_full_name(parent),
                    "delegating edit upward"
                );
                propagate(cx, parent, edit, Direction::Upward, visited)
            }
            None => apply_downward(cx, port, edit, visited),
        },
        Direction::Downward => apply_downward(cx, port, edit, visited),
    }
}

fn apply_downward(
    cx: &mut EditContext<'_>,
    port: PortId,
    edit: &PortEdit,
    visited: &mut BTreeSet<PortId>,
) -> Result<usize, ModalError> {
    if !visited.insert(port) {
        return Ok(0);
    }
    if visited.len() == 1 {
        check_group(cx.graph, port, edit)?;
        debug!(port = %cx.graph.port_full_name(port), edit = %edit.label(), "mirroring edit");
    }
    // Children are resolved by name, so they have to be collected before a
    // rename or removal changes the name lookup.
    let children = mirror_children(cx.graph, port)?;
    apply_local(cx, port, edit)?;
    let mut applied = 1;
    for child in children {
        applied += propagate(cx, child, edit, Direction::Downward, visited)?;
    }
    Ok(applied)
}

/// Reject edits that would fail part way through the group.
fn check_group(graph: &Graph, root: PortId, edit: &PortEdit) -> Result<(), ModalError> {
    match edit {
        PortEdit::Rename(name) => {
            let group = resolve_group(graph, root)?;
            for member in group.members {
                let container = graph.port(member)?.container;
                if let Some(existing) = graph.find_port(container, name) {
                    if existing != member {
                        return Err(ModalError::NameDuplication {
                            container: graph.full_name(container),
                            name: name.clone(),
                        });
                    }
                }
            }
            Ok(())
        }
        PortEdit::Move(Move::Index(index)) => {
            let group = resolve_group(graph, root)?;
            for member in group.members {
                let len = graph.entity(graph.port(member)?.container)?.ports.len();
                if *index >= len {
                    return Err(ModalError::IndexOutOfRange { index: *index, len });
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Apply an edit to one port, without mirroring.
pub(crate) fn apply_local(cx: &mut EditContext<'_>, port: PortId, edit: &PortEdit) -> Result<(), ModalError> {
    cx.touched.push(port);
    let container = cx.graph.port(port)?.container;
    let is_controller = cx.graph.entity(container)?.is_controller();
    match edit {
        PortEdit::Input(value) => {
            let port = cx.graph.port_mut(port)?;
            port.input = *value;
            port.automatically_input = false;
            if is_controller {
                promote_controller_input(port);
            }
        }
        PortEdit::Output(value) => {
            let port = cx.graph.port_mut(port)?;
            port.output = *value;
            if is_controller {
                if *value {
                    promote_controller_input(port);
                } else if port.automatically_input {
                    port.input = false;
                    port.automatically_input = false;
                }
            }
        }
        PortEdit::Multiport(value) => {
            cx.graph.port_mut(port)?.multiport = *value;
            let width = if *value { Width::Infer } else { Width::Fixed(1) };
            let relations = cx.graph.port(port)?.relations.clone();
            for relation in relations {
                cx.graph.set_relation_width(relation, width)?;
            }
        }
        PortEdit::Rename(name) => {
            let old = cx.graph.port(port)?.name.clone();
            cx.graph.rename_port(port, name)?;
            rename_served_relation(cx.graph, container, &old, name)?;
        }
        PortEdit::Remove => {
            cx.graph.remove_port(port)?;
        }
        PortEdit::Move(to) => {
            cx.graph.move_port(port, *to)?;
        }
        PortEdit::DeclaredType(declared_type) => {
            cx.graph.port_mut(port)?.declared_type = declared_type.clone();
        }
        PortEdit::DefaultValue(default_value) => {
            cx.graph.port_mut(port)?.default_value = default_value.clone();
        }
    }
    Ok(())
}

/// A controller reads the outputs of the refinements to evaluate guards, so
/// a controller port that mirrors an output is also an input.  The derived
/// flag is recorded so that it can be told apart from a user setting.
pub(crate) fn promote_controller_input(port: &mut crate::kernel::Port) {
    if port.output && !port.input {
        port.input = true;
        port.automatically_input = true;
    }
}

fn rename_served_relation(graph: &mut Graph, entity: EntityId, old: &str, new: &str) -> Result<(), ModalError> {
    if !matches!(graph.entity(entity)?.kind, EntityKind::Modal) {
        return Ok(());
    }
    if let Some(relation) = graph.find_relation(entity, &relation_name(old)) {
        let renamed = relation_name(new);
        if graph.find_relation(entity, &renamed).is_none() {
            graph.rename_relation(relation, &renamed)?;
        }
    }
    Ok(())
}
