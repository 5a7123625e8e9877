use modal::causality::{summarize, CacheStats, CausalityInterface, Dependency, DependencyKind};
use modal::kernel::{EntityId, PortSpec};
use modal::models::{Declared, Delayed, ModalConfig, ModalModel, RefinementBody, RefinementTemplate};
use modal::utils::errors::ModalError;

fn delayed(delay: f64) -> RefinementTemplate {
    RefinementTemplate::Prototype(RefinementBody::new(Box::new(Delayed::new(delay))))
}

/// A switch passes `in` straight through to `out` while on, and holds it
/// while off.
fn switch(config: ModalConfig) -> (ModalModel, EntityId) {
    let mut model = ModalModel::with_config("switch", config).unwrap();
    let root = model.root();
    model.new_port_with(root, &PortSpec::new("in").input()).unwrap();
    model.new_port_with(root, &PortSpec::new("out").output()).unwrap();
    model.add_state(root, "on").unwrap();
    model.add_state(root, "off").unwrap();
    model.add_transition(root, "disable", "on", "off").unwrap();
    model.add_transition(root, "enable", "off", "on").unwrap();
    model.set_guard(root, "disable", "in > 10").unwrap();
    model
        .add_refinement(root, "on", "passthrough", &RefinementTemplate::class("Instantaneous"), None)
        .unwrap();
    model.add_refinement(root, "off", "hold", &delayed(2.5), None).unwrap();
    (model, root)
}

fn precise() -> ModalConfig {
    ModalConfig {
        state_dependent_causality: true,
        ..ModalConfig::default()
    }
}

#[test]
fn conservative_causality_covers_every_state() {
    let (mut model, root) = switch(ModalConfig::default());
    let causality = model.causality_interface(root).unwrap();
    assert!(!causality.is_state_dependent());
    assert_eq!(causality.dependency("in", "out"), Dependency::Boolean(true));

    model.set_current_state(root, "off").unwrap();
    let causality = model.causality_interface(root).unwrap();
    assert!(causality.dependency("in", "out").is_dependent());
    assert_eq!(causality.dependent_ports("out"), vec!["in"]);
}

#[test]
fn state_dependent_causality_follows_the_current_state() {
    let (mut model, root) = switch(precise());
    let on = model.causality_interface(root).unwrap();
    assert!(on.is_state_dependent());
    assert!(on.dependency("in", "out").is_dependent());

    model.set_current_state(root, "off").unwrap();
    let off = model.causality_interface(root).unwrap();
    assert!(!off.dependency("in", "out").is_dependent());
    assert!(off.dependent_ports("in").is_empty());

    let conservative = model.conservative_causality(root).unwrap();
    assert!(conservative.dependency("in", "out").is_dependent());
}

#[test]
fn real_dependencies_carry_delays() {
    let config = ModalConfig {
        dependency: DependencyKind::Real,
        ..precise()
    };
    let (mut model, root) = switch(config);
    assert_eq!(
        model.causality_interface(root).unwrap().dependency("in", "out"),
        Dependency::Real(0.0)
    );
    model.set_current_state(root, "off").unwrap();
    assert_eq!(
        model.causality_interface(root).unwrap().dependency("in", "out"),
        Dependency::Real(2.5)
    );
    // The quickest path wins when every state is considered
    assert_eq!(
        model.conservative_causality(root).unwrap().dependency("in", "out"),
        Dependency::Real(0.0)
    );
}

#[test]
fn switching_states_reuses_cached_causality() {
    let (mut model, root) = switch(precise());
    model.causality_interface(root).unwrap();
    model.causality_interface(root).unwrap();
    model.set_current_state(root, "off").unwrap();
    model.causality_interface(root).unwrap();
    model.set_current_state(root, "on").unwrap();
    let generation = model.generation();
    model.causality_interface(root).unwrap();
    assert_eq!(model.generation(), generation);
    assert_eq!(
        model.cache_stats(),
        CacheStats {
            hits: 2,
            misses: 2,
            stale: 0
        }
    );
}

#[test]
fn structural_edits_invalidate_cached_causality() {
    let (mut model, root) = switch(precise());
    model.set_current_state(root, "off").unwrap();
    let before = model.causality_interface(root).unwrap();
    assert!(!before.dependency("in", "out").is_dependent());

    // The controller now drives `out` from `in` when leaving `off`
    model.set_output_actions(root, "enable", "out = in * 2").unwrap();
    let after = model.causality_interface(root).unwrap();
    assert!(after.dependency("in", "out").is_dependent());
    assert!(!before.dependency("in", "out").is_dependent());
    assert_eq!(model.cache_stats().stale, 1);
}

#[test]
fn guard_inputs_feed_controller_outputs() {
    let (mut model, root) = switch(precise());
    model.new_port_with(root, &PortSpec::new("level").input()).unwrap();
    model.new_port_with(root, &PortSpec::new("alarm").output()).unwrap();
    model.set_guard(root, "enable", "level_isPresent && level > 3").unwrap();
    model.set_output_actions(root, "enable", "alarm = true").unwrap();
    model.set_current_state(root, "off").unwrap();

    let off = model.causality_interface(root).unwrap();
    assert!(off.dependency("level", "alarm").is_dependent());
    assert!(!off.dependency("in", "alarm").is_dependent());
    // Guards may read any input, so the controller ties all inputs together
    assert_eq!(off.equivalent_ports("in"), vec!["in", "level"]);
}

#[test]
fn malformed_guards_are_reported_and_not_cached() {
    let (mut model, root) = switch(precise());
    model.set_guard(root, "disable", "in >").unwrap();
    let result = model.causality_interface(root);
    assert!(matches!(result, Err(ModalError::MalformedGuard { .. })));
    let result = model.causality_interface(root);
    assert!(matches!(result, Err(ModalError::MalformedGuard { .. })));
    assert_eq!(model.cache_stats().hits, 0);

    model.set_guard(root, "disable", "in > 0").unwrap();
    assert!(model.causality_interface(root).is_ok());
}

#[test]
fn declared_dependencies_are_honored() {
    let mut model = ModalModel::with_config("router", precise()).unwrap();
    let root = model.root();
    for name in &["a", "b"] {
        model.new_port_with(root, &PortSpec::new(name).input()).unwrap();
    }
    for name in &["x", "y"] {
        model.new_port_with(root, &PortSpec::new(name).output()).unwrap();
    }
    model.add_state(root, "routing").unwrap();
    let declared = Declared::default().with("a", "x").with("b", "x").with("b", "y");
    let template = RefinementTemplate::Prototype(RefinementBody::new(Box::new(declared)));
    model.add_refinement(root, "routing", "table", &template, None).unwrap();

    let causality = model.causality_interface(root).unwrap();
    assert!(causality.dependency("a", "x").is_dependent());
    assert!(!causality.dependency("a", "y").is_dependent());
    assert!(causality.dependency("b", "y").is_dependent());

    let summary = summarize(&causality);
    assert_eq!(summary.dependencies.len(), 3);
    assert_eq!(summary.equivalence_classes, vec![vec!["a", "b"]]);
}

#[test]
fn nested_modal_models_contribute_their_causality() {
    let (mut model, root) = switch(ModalConfig::default());
    let inner = model.add_modal_refinement(root, "off", "inner").unwrap();
    model.add_state(inner, "waiting").unwrap();
    model
        .add_refinement(inner, "waiting", "echo", &RefinementTemplate::class("Instantaneous"), None)
        .unwrap();

    let inner_causality = model.causality_interface(inner).unwrap();
    assert!(inner_causality.dependency("in", "out").is_dependent());

    model.remove_refinement(model.entity_by_path(".switch.passthrough").unwrap()).unwrap();
    let causality = model.causality_interface(root).unwrap();
    assert!(causality.dependency("in", "out").is_dependent());
}

#[test]
fn nested_state_switches_reach_the_enclosing_causality() {
    let mut model = ModalModel::with_config("outer", precise()).unwrap();
    let root = model.root();
    model.new_port_with(root, &PortSpec::new("in").input()).unwrap();
    model.new_port_with(root, &PortSpec::new("out").output()).unwrap();
    model.add_state(root, "running").unwrap();
    let inner = model.add_modal_refinement(root, "running", "inner").unwrap();
    model.add_state(inner, "pass").unwrap();
    model.add_state(inner, "block").unwrap();
    model
        .add_refinement(inner, "pass", "echo", &RefinementTemplate::class("Instantaneous"), None)
        .unwrap();
    model.add_refinement(inner, "block", "hold", &delayed(1.0), None).unwrap();

    assert!(model.causality_interface(root).unwrap().dependency("in", "out").is_dependent());

    model.set_current_state(inner, "block").unwrap();
    assert!(!model.causality_interface(inner).unwrap().dependency("in", "out").is_dependent());
    assert!(!model.causality_interface(root).unwrap().dependency("in", "out").is_dependent());
    assert!(!model
        .conservative_causality(root)
        .unwrap()
        .dependency("in", "out")
        .is_dependent());

    model.set_current_state(inner, "pass").unwrap();
    assert!(model.causality_interface(root).unwrap().dependency("in", "out").is_dependent());
    assert_eq!(model.cache_stats().stale, 0);
}

#[test]
fn causality_queries_need_a_modal_model() {
    let (model, root) = switch(ModalConfig::default());
    let controller = model.controller(root).unwrap();
    assert!(matches!(
        model.causality_interface(controller),
        Err(ModalError::NotModalContainer(_))
    ));
}
