use modal::editor::WebModalModel;
use modal::kernel::PortSpec;

fn web_switch() -> WebModalModel {
    let mut web = WebModalModel::post("top");
    web.add_state(".top", "on");
    web.add_state(".top", "off");
    web.add_transition(".top", "toggle", "on", "off");
    web.set_guard(".top", "toggle", "in_isPresent");
    web.new_port_json(".top", r#"{"name": "in", "input": true}"#);
    web.new_port_json(".top", r#"{"name": "out", "output": true}"#);
    web.add_refinement(".top", "on", "passthrough", "Instantaneous");
    web
}

#[test]
fn ports_are_mirrored_through_the_facade() {
    let mut web = web_switch();
    assert_eq!(web.port_names_json(".top.passthrough"), r#"["in","out"]"#);
    let touched = web.edit_port_json(".top.passthrough", "in", r#"{"rename": "data"}"#);
    assert_eq!(touched, 3);
    assert_eq!(web.port_names_json(".top._Controller"), r#"["data","out"]"#);

    let ports: Vec<PortSpec> = serde_json::from_str(&web.ports_json(".top")).unwrap();
    assert_eq!(ports, vec![PortSpec::new("data").input(), PortSpec::new("out").output()]);
}

#[test]
fn causality_is_summarized() {
    let web = web_switch();
    let summary: serde_json::Value = serde_json::from_str(&web.causality_json(".top")).unwrap();
    assert_eq!(summary["dependencies"][0]["input"], "in");
    assert_eq!(summary["dependencies"][0]["output"], "out");
    assert_eq!(summary["equivalenceClasses"][0][0], "in");
    assert!(web.causality_yaml(".top").contains("dependencies"));
}

#[test]
fn documents_round_trip_through_the_facade() {
    let web = web_switch();
    let copy = WebModalModel::post_json(&web.get_json());
    assert_eq!(copy.port_names_json(".top.passthrough"), r#"["in","out"]"#);
    let copy = WebModalModel::post_yaml(&web.get_yaml());
    assert_eq!(copy.status(), "1 refinements, in on, at generation 1");
}

#[test]
fn change_requests_are_queued_and_executed() {
    let mut web = web_switch();
    web.request_change_json(r#"{"type": "addRefinement", "modal": ".top", "state": "off", "name": "hold", "class": "Delayed"}"#);
    web.request_change_yaml("type: removeRefinement\nrefinement: .top.passthrough\n");
    assert_eq!(web.execute_change_requests(), 2);
    assert_eq!(web.model().refinements(web.model().root()).unwrap().len(), 1);
    assert_eq!(web.remove_unused_refinements(".top"), 0);
    web.remove_refinement(".top.hold");
    assert!(web.status().starts_with("0 refinements, in on"));
}

#[test]
#[should_panic]
fn facade_errors_panic() {
    let mut web = web_switch();
    web.add_state(".top", "on");
}
