use serde::{Deserialize, Serialize};

use super::{EntityId, RelationId};

/// The user-facing description of a port, used to create ports outside of
/// the mirrored protocol (pasting, document loading) and to describe them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSpec {
    pub name: String,
    #[serde(default)]
    pub input: bool,
    #[serde(default)]
    pub output: bool,
    #[serde(default)]
    pub multiport: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl PortSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn input(mut self) -> Self {
        self.input = true;
        self
    }

    pub fn output(mut self) -> Self {
        self.output = true;
        self
    }

    pub fn multiport(mut self) -> Self {
        self.multiport = true;
        self
    }
}

/// A `Port` belongs to exactly one entity.  Ports of the same name across a
/// modal model, its controller, and its refinements form a mirror group.
#[derive(Clone, Debug, PartialEq)]
pub struct Port {
    pub(crate) name: String,
    pub(crate) container: EntityId,
    pub(crate) input: bool,
    pub(crate) output: bool,
    pub(crate) multiport: bool,
    pub(crate) automatically_input: bool,
    pub(crate) declared_type: Option<String>,
    pub(crate) default_value: Option<String>,
    pub(crate) relations: Vec<RelationId>,
}

impl Port {
    pub(crate) fn new(name: &str, container: EntityId) -> Self {
        Self::from_spec(&PortSpec::new(name), container)
    }

    pub(crate) fn from_spec(spec: &PortSpec, container: EntityId) -> Self {
        Self {
            name: spec.name.clone(),
            container,
            input: spec.input,
            output: spec.output,
            multiport: spec.multiport,
            automatically_input: false,
            declared_type: spec.declared_type.clone(),
            default_value: spec.default_value.clone(),
            relations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container(&self) -> EntityId {
        self.container
    }

    pub fn is_input(&self) -> bool {
        self.input
    }

    pub fn is_output(&self) -> bool {
        self.output
    }

    pub fn is_multiport(&self) -> bool {
        self.multiport
    }

    /// True when the input flag was derived from a refinement output, rather
    /// than set by the user.  Only controller ports carry it.
    pub fn is_automatically_input(&self) -> bool {
        self.automatically_input
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn relations(&self) -> &[RelationId] {
        &self.relations
    }

    pub fn spec(&self) -> PortSpec {
        PortSpec {
            name: self.name.clone(),
            input: self.input,
            output: self.output,
            multiport: self.multiport,
            declared_type: self.declared_type.clone(),
            default_value: self.default_value.clone(),
        }
    }
}
