use serde::{Deserialize, Serialize};

use super::{EntityId, PortId};

/// Relation width.  Relations linked to a multiport infer their width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Width {
    Fixed(usize),
    Infer,
}

/// A `Relation` connects ports.  Modal models hold one `<name>Relation` per
/// port, linking their own port with the mirror ports inside.
#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    pub(crate) name: String,
    pub(crate) container: EntityId,
    pub(crate) ports: Vec<PortId>,
    pub(crate) width: Width,
}

impl Relation {
    pub(crate) fn new(name: &str, container: EntityId) -> Self {
        Self {
            name: name.to_string(),
            container,
            ports: Vec::new(),
            width: Width::Fixed(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container(&self) -> EntityId {
        self.container
    }

    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }

    pub fn width(&self) -> Width {
        self.width
    }
}

/// The conventional name of the relation serving the port `port_name`.
pub fn relation_name(port_name: &str) -> String {
    format!("{}Relation", port_name)
}
