use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ActorRepr;
use crate::causality::{ActorCausality, Dependency, PortSignature};
use crate::kernel::{EntityId, Graph};
use crate::utils::errors::ModalError;

pub trait ActorClone {
    fn clone_box(&self) -> Box<dyn RefinementActor>;
}

impl<T> ActorClone for T
where
    T: 'static + RefinementActor + Clone,
{
    fn clone_box(&self) -> Box<dyn RefinementActor> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn RefinementActor> {
    fn clone(&self) -> Box<dyn RefinementActor> {
        self.clone_box()
    }
}

pub trait SerializableActor {
    fn get_type(&self) -> &'static str {
        "Actor"
    }
    fn serialize(&self) -> serde_yaml::Value {
        serde_yaml::Value::Null
    }
}

/// The `RefinementActor` trait defines the behavior a refinement needs for
/// modal model analysis: its causality over whatever ports the mirroring
/// protocol has given it, and a status for reporting.
pub trait RefinementActor: ActorClone + SerializableActor + Send + Sync {
    fn causality(&self, signature: &PortSignature, default: Dependency) -> ActorCausality;
    fn status(&self) -> String;
}

/// `RefinementBody` wraps the refinement actor of a refinement entity.  It
/// serializes as the actor's fields with a `type` tag, and deserializes
/// through the refinement factory.
#[derive(Clone)]
pub struct RefinementBody {
    inner: Box<dyn RefinementActor>,
}

impl RefinementBody {
    pub fn new(inner: Box<dyn RefinementActor>) -> Self {
        Self { inner }
    }

    pub fn actor(&self) -> &dyn RefinementActor {
        self.inner.as_ref()
    }

    pub fn get_type(&self) -> &'static str {
        self.inner.get_type()
    }
}

impl fmt::Debug for RefinementBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefinementBody")
            .field("type", &self.inner.get_type())
            .field("status", &self.inner.status())
            .finish()
    }
}

impl Serialize for RefinementBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra_fields: serde_yaml::Value = self.inner.serialize();
        let mut actor = serializer.serialize_map(None)?;
        actor.serialize_entry("type", self.inner.get_type())?;
        if let serde_yaml::Value::Mapping(map) = extra_fields {
            for (key, value) in map.iter() {
                actor.serialize_entry(&key, &value)?;
            }
        }
        actor.end()
    }
}

impl<'de> Deserialize<'de> for RefinementBody {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let actor_repr = ActorRepr::deserialize(deserializer)?;
        let concrete_actor = super::refinement_factory::create::<D>(&actor_repr.actor_type[..], actor_repr.extra)?;
        Ok(RefinementBody::new(concrete_actor))
    }
}

/// What a new refinement is made from: a class registered with the
/// refinement factory, or a prototype body to copy.
#[derive(Clone, Debug)]
pub enum RefinementTemplate {
    Class(String),
    Prototype(RefinementBody),
}

impl RefinementTemplate {
    pub fn class(name: &str) -> Self {
        RefinementTemplate::Class(name.to_string())
    }

    pub(crate) fn instantiate(&self) -> Result<RefinementBody, ModalError> {
        match self {
            RefinementTemplate::Class(class) => Ok(RefinementBody::new(super::refinement_factory::instantiate(class)?)),
            RefinementTemplate::Prototype(body) => Ok(body.clone()),
        }
    }
}

/// An `InstanceOpener` is told about a refinement that was just created, so
/// that an editor can show it.  Failing aborts the creation.
pub trait InstanceOpener {
    fn open(&mut self, graph: &Graph, refinement: EntityId) -> Result<(), ModalError>;
}
