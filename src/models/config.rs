use serde::{Deserialize, Serialize};

use crate::causality::DependencyKind;
use crate::utils::errors::ModalError;

/// The settings of a modal model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalConfig {
    /// Answer causality queries for the current state only, instead of for
    /// every state at once.
    #[serde(default)]
    pub state_dependent_causality: bool,
    #[serde(default = "default_controller_name")]
    pub controller_name: String,
    /// Keep the refinement named `default` last among the children, the way
    /// a case construct orders its default branch.
    #[serde(default)]
    pub default_last: bool,
    #[serde(default)]
    pub dependency: DependencyKind,
    #[serde(default)]
    pub store_records: bool,
}

pub fn default_controller_name() -> String {
    String::from("_Controller")
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            state_dependent_causality: false,
            controller_name: default_controller_name(),
            default_last: false,
            dependency: DependencyKind::default(),
            store_records: false,
        }
    }
}

impl ModalConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ModalError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ModalError> {
        Ok(serde_json::from_str(json)?)
    }
}
