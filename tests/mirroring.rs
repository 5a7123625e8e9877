use modal::kernel::{EntityId, PortSpec, Width};
use modal::mirror::PortEdit;
use modal::models::{ModalConfig, ModalModel, RefinementTemplate, Reportable};
use modal::utils::errors::ModalError;

fn model_with_refinements(count: usize) -> (ModalModel, Vec<EntityId>) {
    let mut model = ModalModel::new("top").unwrap();
    let root = model.root();
    model.add_state(root, "idle").unwrap();
    let refinements = (0..count)
        .map(|index| {
            model
                .add_refinement(
                    root,
                    "idle",
                    &format!("r{}", index),
                    &RefinementTemplate::class("Instantaneous"),
                    None,
                )
                .unwrap()
        })
        .collect();
    (model, refinements)
}

fn assert_consistent(model: &ModalModel) {
    let root = model.root();
    let expected = model.port_names(root).unwrap();
    let graph = model.graph();
    for child in graph.entity(root).unwrap().entities() {
        assert_eq!(model.port_names(*child).unwrap(), expected);
        for name in &expected {
            let modal_port = graph.port(model.port(root, name).unwrap()).unwrap();
            let child_port = graph.port(model.port(*child, name).unwrap()).unwrap();
            assert_eq!(child_port.is_output(), modal_port.is_output());
            assert_eq!(child_port.is_multiport(), modal_port.is_multiport());
            if !child_port.is_automatically_input() {
                assert_eq!(child_port.is_input(), modal_port.is_input());
            }
        }
    }
}

#[test]
fn new_port_on_a_refinement_appears_everywhere() {
    let (mut model, refinements) = model_with_refinements(3);
    let root = model.root();
    let port = model.new_port(refinements[1], "data").unwrap();
    assert_eq!(model.graph().port(port).unwrap().container(), refinements[1]);
    assert_consistent(&model);

    let relation = model.graph().find_relation(root, "dataRelation").unwrap();
    assert_eq!(model.graph().relation(relation).unwrap().ports().len(), 5);
}

#[test]
fn new_port_rejects_duplicates() {
    let (mut model, refinements) = model_with_refinements(1);
    model.new_port(refinements[0], "data").unwrap();
    let generation = model.generation();
    let result = model.new_port(model.root(), "data");
    assert!(matches!(result, Err(ModalError::NameDuplication { .. })));
    assert_eq!(model.generation(), generation);
}

#[test]
fn set_output_touches_each_group_member_once() {
    let (mut model, refinements) = model_with_refinements(4);
    let port = model.new_port(refinements[2], "out").unwrap();
    let touched = model.edit_port(port, PortEdit::Output(true)).unwrap();
    assert_eq!(touched, 4 + 2);
    for entity in model.graph().entity(model.root()).unwrap().entities() {
        assert!(!model.is_mirror_disabled(*entity));
    }
    assert!(!model.is_mirror_disabled(model.root()));
    assert_consistent(&model);
}

#[test]
fn refinement_outputs_are_controller_inputs() {
    let (mut model, refinements) = model_with_refinements(1);
    let root = model.root();
    let controller = model.controller(root).unwrap();
    let port = model.new_port(refinements[0], "out").unwrap();
    model.set_output(port, true).unwrap();

    let controller_port = model.port(controller, "out").unwrap();
    let graph = model.graph();
    assert!(graph.port(controller_port).unwrap().is_input());
    assert!(graph.port(controller_port).unwrap().is_automatically_input());
    assert!(!graph.port(port).unwrap().is_input());

    // An explicit input setting on the derived port stays local
    let touched = model.edit_port(controller_port, PortEdit::Input(false)).unwrap();
    assert_eq!(touched, 1);
    assert!(!model.graph().port(controller_port).unwrap().is_input());

    model.set_output(port, false).unwrap();
    assert!(!model.graph().port(controller_port).unwrap().is_output());
}

#[test]
fn set_input_is_idempotent() {
    let (mut model, refinements) = model_with_refinements(2);
    let port = model.new_port(refinements[0], "in").unwrap();
    model.set_input(port, true).unwrap();
    let first: Vec<_> = model
        .mirror_group(port)
        .unwrap()
        .members
        .iter()
        .map(|member| model.graph().port(*member).unwrap().spec())
        .collect();
    model.set_input(port, true).unwrap();
    let second: Vec<_> = model
        .mirror_group(port)
        .unwrap()
        .members
        .iter()
        .map(|member| model.graph().port(*member).unwrap().spec())
        .collect();
    assert_eq!(first, second);
    assert!(second.iter().all(|spec| spec.input));
}

#[test]
fn rename_renames_group_and_relation() {
    let (mut model, refinements) = model_with_refinements(2);
    let root = model.root();
    let port = model.new_port(refinements[1], "in").unwrap();
    model.rename_port(port, "data").unwrap();
    assert_eq!(model.port_names(root).unwrap(), vec!["data"]);
    assert_consistent(&model);
    assert!(model.graph().find_relation(root, "dataRelation").is_some());
    assert!(model.graph().find_relation(root, "inRelation").is_none());
}

#[test]
fn rename_collision_changes_nothing() {
    let (mut model, refinements) = model_with_refinements(2);
    let a = model.new_port(refinements[0], "a").unwrap();
    model.new_port(refinements[0], "b").unwrap();
    let result = model.rename_port(a, "b");
    assert!(matches!(result, Err(ModalError::NameDuplication { .. })));
    assert_eq!(model.port_names(refinements[1]).unwrap(), vec!["a", "b"]);
    assert_consistent(&model);
}

#[test]
fn removing_a_refinement_port_removes_it_everywhere() {
    let (mut model, refinements) = model_with_refinements(3);
    let root = model.root();
    model.new_port(root, "keep").unwrap();
    let port = model.new_port(refinements[2], "gone").unwrap();
    model.remove_port(port).unwrap();
    assert_eq!(model.port_names(root).unwrap(), vec!["keep"]);
    assert_consistent(&model);
    assert!(model.graph().find_relation(root, "goneRelation").is_none());
    assert!(model.graph().find_relation(root, "keepRelation").is_some());
}

#[test]
fn reordering_is_mirrored() {
    let (mut model, refinements) = model_with_refinements(2);
    for name in &["a", "b", "c"] {
        model.new_port(model.root(), name).unwrap();
    }
    let c = model.port(refinements[0], "c").unwrap();
    assert_eq!(model.move_to_first(c).unwrap(), Some(2));
    assert_eq!(model.port_names(refinements[1]).unwrap(), vec!["c", "a", "b"]);
    assert_eq!(model.move_up(c).unwrap(), None);
    assert_eq!(model.move_down(c).unwrap(), Some(0));
    assert_eq!(model.move_to_last(c).unwrap(), Some(1));
    assert_consistent(&model);
    assert_eq!(model.port_names(model.root()).unwrap(), vec!["a", "b", "c"]);

    let result = model.move_to_index(c, 10);
    assert!(matches!(result, Err(ModalError::IndexOutOfRange { index: 10, len: 3 })));
    assert_eq!(model.move_to_index(c, 1).unwrap(), Some(2));
    assert_eq!(model.port_names(refinements[0]).unwrap(), vec!["a", "c", "b"]);
}

#[test]
fn multiport_relations_infer_width() {
    let (mut model, refinements) = model_with_refinements(1);
    let root = model.root();
    let port = model.new_port(refinements[0], "bus").unwrap();
    model.set_multiport(port, true).unwrap();
    let relation = model.graph().find_relation(root, "busRelation").unwrap();
    assert_eq!(model.graph().relation(relation).unwrap().width(), Width::Infer);
    model.set_multiport(port, false).unwrap();
    assert_eq!(model.graph().relation(relation).unwrap().width(), Width::Fixed(1));
}

#[test]
fn types_and_default_values_are_mirrored() {
    let (mut model, refinements) = model_with_refinements(2);
    let port = model.new_port(refinements[0], "level").unwrap();
    model.set_declared_type(port, Some("double")).unwrap();
    model.set_default_value(port, Some("0.0")).unwrap();
    for member in model.mirror_group(port).unwrap().members {
        let member = model.graph().port(member).unwrap();
        assert_eq!(member.declared_type(), Some("double"));
        assert_eq!(member.default_value(), Some("0.0"));
    }
}

#[test]
fn disabled_mirroring_keeps_edits_local() {
    let (mut model, refinements) = model_with_refinements(2);
    let root = model.root();
    let port = model.new_port(root, "in").unwrap();
    let local = model.port(refinements[0], "in").unwrap();
    let touched = model
        .with_mirror_disabled(refinements[0], |model| model.edit_port(local, PortEdit::Input(true)))
        .unwrap();
    assert_eq!(touched, 1);
    assert!(!model.is_mirror_disabled(refinements[0]));
    assert!(model.graph().port(local).unwrap().is_input());
    assert!(!model.graph().port(port).unwrap().is_input());

    let result = model.with_mirror_disabled(refinements[1], |model| {
        model.new_port(refinements[1], "only")?;
        Err::<(), _>(ModalError::IllegalStructure(String::from("abandoned")))
    });
    assert!(result.is_err());
    assert!(!model.is_mirror_disabled(refinements[1]));
}

#[test]
fn pasted_ports_need_a_modal_counterpart() {
    let (mut model, refinements) = model_with_refinements(1);
    let root = model.root();
    let result = model.add_port(refinements[0], &PortSpec::new("stray"));
    assert!(matches!(result, Err(ModalError::PortOutsideProtocol { .. })));

    model.new_port_with(root, &PortSpec::new("x").output()).unwrap();
    let local = model.port(refinements[0], "x").unwrap();
    model
        .with_mirror_disabled(refinements[0], |model| model.remove_port(local))
        .unwrap();
    assert!(model.port_names(refinements[0]).unwrap().is_empty());

    let pasted = model.add_port(refinements[0], &PortSpec::new("x")).unwrap();
    assert!(model.graph().port(pasted).unwrap().is_output());
    assert_consistent(&model);
}

#[test]
fn nested_modal_models_mirror_through_every_level() {
    let (mut model, _) = model_with_refinements(1);
    let root = model.root();
    let inner = model.add_modal_refinement(root, "idle", "inner").unwrap();
    let inner_controller = model.controller(inner).unwrap();

    let port = model.new_port(inner_controller, "deep").unwrap();
    assert_eq!(model.graph().port(port).unwrap().container(), inner_controller);
    let group = model.mirror_group(port).unwrap();
    assert_eq!(group.owner, root);
    assert_eq!(group.root(), Some(model.port(root, "deep").unwrap()));
    assert_eq!(group.len(), 5);
    assert!(model.graph().find_relation(inner, "deepRelation").is_some());

    model.set_output(port, true).unwrap();
    for member in &group.members {
        assert!(model.graph().port(*member).unwrap().is_output());
    }
    assert!(model.graph().port(port).unwrap().is_automatically_input());
}

#[test]
fn type_constraints_follow_port_direction() {
    let (mut model, _) = model_with_refinements(1);
    let root = model.root();
    model.new_port_with(root, &PortSpec::new("in").input()).unwrap();
    model.new_port_with(root, &PortSpec::new("out").output()).unwrap();
    let constraints = model.type_constraints(root).unwrap();
    // controller and refinement: one each for `in`, two each for `out`
    assert_eq!(constraints.len(), 6);
    let out = model.port(root, "out").unwrap();
    assert!(constraints.iter().any(|constraint| constraint.greater == out));
}

#[test]
fn committed_edits_are_recorded() {
    let config = ModalConfig {
        store_records: true,
        ..ModalConfig::default()
    };
    let mut model = ModalModel::with_config("top", config).unwrap();
    let root = model.root();
    let port = model.new_port(root, "in").unwrap();
    model.set_input(port, true).unwrap();
    model.rename_port(port, "data").unwrap();
    let actions: Vec<&str> = model
        .records()
        .iter()
        .map(|record| record.action.as_str())
        .collect();
    assert_eq!(actions, vec!["NewPort", "SetInput(true)", "Rename(data)"]);
    assert_eq!(model.records()[1].ports, 2);
    assert!(model.status().contains("generation 3"));
}
