use super::refinement::RefinementActor;
use serde::de;
use serde::Deserializer;
use std::collections::HashMap;

use lazy_static::lazy_static;
use parking_lot::Mutex;

use crate::utils::errors::ModalError;

pub type ActorConstructor = fn(serde_yaml::Value) -> Option<Box<dyn RefinementActor>>;
lazy_static! {
    static ref CONSTRUCTORS: Mutex<HashMap<&'static str, ActorConstructor>> = {
        let mut m = HashMap::new();
        m.insert("Declared", super::Declared::from_value as ActorConstructor);
        m.insert("Delayed", super::Delayed::from_value as ActorConstructor);
        m.insert(
            "Instantaneous",
            super::Instantaneous::from_value as ActorConstructor,
        );
        Mutex::new(m)
    };
}

pub fn register(actor_type: &'static str, actor_constructor: ActorConstructor) {
    CONSTRUCTORS.lock().insert(actor_type, actor_constructor);
}

/// The registered refinement classes, sorted by name.
pub fn classes() -> Vec<&'static str> {
    let mut classes: Vec<&'static str> = CONSTRUCTORS.lock().keys().copied().collect();
    classes.sort_unstable();
    classes
}

pub fn create<'de, D: Deserializer<'de>>(
    actor_type: &str,
    extra_fields: serde_yaml::Value,
) -> Result<Box<dyn RefinementActor>, D::Error> {
    let constructor = CONSTRUCTORS.lock().get(actor_type).copied();
    match constructor {
        Some(constructor) => constructor(extra_fields).ok_or_else(|| {
            de::Error::custom(format!("invalid fields for refinement class `{}`", actor_type))
        }),
        None => Err(de::Error::custom(format!(
            "unknown refinement class `{}`, expected one of {:?}",
            actor_type,
            classes()
        ))),
    }
}

/// Create a refinement actor of a registered class with its default
/// settings.
pub fn instantiate(actor_type: &str) -> Result<Box<dyn RefinementActor>, ModalError> {
    let constructor = CONSTRUCTORS
        .lock()
        .get(actor_type)
        .copied()
        .ok_or_else(|| ModalError::UnknownRefinementClass(actor_type.to_string()))?;
    constructor(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()))
        .ok_or_else(|| ModalError::UnknownRefinementClass(actor_type.to_string()))
}
