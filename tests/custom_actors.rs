use serde::{Deserialize, Serialize};

use modal::causality::{ActorCausality, CausalityInterface, Dependency, PortSignature};
use modal::kernel::PortSpec;
use modal::models::refinement_factory;
use modal::models::{ModalModel, RefinementActor, RefinementBody, RefinementTemplate, SerializableActor};
use modal_derive::{register, SerializableActor};

/// Passes its inputs through when sampling continuously, and holds them
/// otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, SerializableActor)]
#[serde(rename_all = "camelCase")]
struct Sampler {
    #[serde(default)]
    period: f64,
}

impl RefinementActor for Sampler {
    fn causality(&self, signature: &PortSignature, default: Dependency) -> ActorCausality {
        if self.period == 0.0 {
            ActorCausality::all_to_all(signature.clone(), default)
        } else {
            ActorCausality::new(signature.clone(), default)
        }
    }

    fn status(&self) -> String {
        format!("Sampling every {}", self.period)
    }
}

fn sampled_model(template: &RefinementTemplate) -> ModalModel {
    register!(Sampler);
    let mut model = ModalModel::new("sampled").unwrap();
    let root = model.root();
    model.new_port_with(root, &PortSpec::new("in").input()).unwrap();
    model.new_port_with(root, &PortSpec::new("out").output()).unwrap();
    model.add_state(root, "running").unwrap();
    model.add_refinement(root, "running", "sampler", template, None).unwrap();
    model
}

#[test]
fn registered_actors_are_refinement_classes() {
    register!(Sampler);
    assert!(refinement_factory::classes().contains(&"Sampler"));
    let model = sampled_model(&RefinementTemplate::class("Sampler"));
    let causality = model.causality_interface(model.root()).unwrap();
    assert!(causality.dependency("in", "out").is_dependent());
}

#[test]
fn custom_actors_round_trip_through_documents() {
    let prototype = RefinementTemplate::Prototype(RefinementBody::new(Box::new(Sampler { period: 2.0 })));
    let model = sampled_model(&prototype);
    let yaml = model.to_yaml().unwrap();
    assert!(yaml.contains("type: Sampler"));

    let loaded = ModalModel::from_yaml(&yaml).unwrap();
    let sampler = loaded.entity_by_path(".sampled.sampler").unwrap();
    let body = loaded.graph().entity(sampler).unwrap().body().unwrap();
    assert_eq!(body.get_type(), "Sampler");
    assert_eq!(body.actor().status(), "Sampling every 2");
    let causality = loaded.causality_interface(loaded.root()).unwrap();
    assert!(!causality.dependency("in", "out").is_dependent());
}

#[test]
fn invalid_fields_are_rejected() {
    register!(Sampler);
    let yaml = r#"
model:
  name: sampled
  refinements:
    - kind: actor
      name: sampler
      actor:
        type: Sampler
        period: often
"#;
    assert!(ModalModel::from_yaml(yaml).is_err());
}

#[test]
fn derived_serialization_carries_the_fields() {
    let sampler = Sampler { period: 0.5 };
    assert_eq!(SerializableActor::get_type(&sampler), "Sampler");
    let value = SerializableActor::serialize(&sampler);
    assert_eq!(value.get("period").and_then(serde_yaml::Value::as_f64), Some(0.5));
}
