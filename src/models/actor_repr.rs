use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ActorRepr {
    #[serde(rename = "type")]
    pub actor_type: String,
    #[serde(flatten)]
    pub extra: serde_yaml::Value,
}
