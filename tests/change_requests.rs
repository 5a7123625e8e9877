use std::sync::Arc;

use parking_lot::Mutex;

use modal::kernel::PortSpec;
use modal::mirror::PortEdit;
use modal::models::{ChangeListener, ChangeRequest, ModalModel, SharedModel};
use modal::utils::errors::ModalError;

#[derive(Default)]
struct Journal {
    executed: Vec<String>,
    failed: Vec<String>,
}

struct JournalListener {
    journal: Arc<Mutex<Journal>>,
}

impl ChangeListener for JournalListener {
    fn change_executed(&mut self, request: &ChangeRequest) {
        self.journal.lock().executed.push(request.label());
    }

    fn change_failed(&mut self, request: &ChangeRequest, _error: &ModalError) {
        self.journal.lock().failed.push(request.label());
    }
}

const REQUESTS: &str = r#"
- type: addState
  modal: .top
  state: idle
- type: newPort
  entity: .top
  port:
    name: in
    input: true
- type: addRefinement
  modal: .top
  state: idle
  name: worker
  class: Instantaneous
- type: addTransition
  modal: .top
  name: loop
  source: idle
  destination: missing
- type: editPort
  entity: .top.worker
  port: in
  edit:
    rename: data
- type: setParameter
  entity: .top._Controller
  name: period
  value: "10"
"#;

fn queued() -> ModalModel {
    let mut model = ModalModel::new("top").unwrap();
    let requests: Vec<ChangeRequest> = serde_yaml::from_str(REQUESTS).unwrap();
    for request in requests {
        model.request_change(request);
    }
    model
}

#[test]
fn requests_are_read_from_yaml() {
    let requests: Vec<ChangeRequest> = serde_yaml::from_str(REQUESTS).unwrap();
    assert_eq!(requests.len(), 6);
    assert_eq!(
        requests[1],
        ChangeRequest::NewPort {
            entity: String::from(".top"),
            port: PortSpec::new("in").input(),
        }
    );
    assert_eq!(requests[3].label(), "AddTransition(.top:loop)");
    assert_eq!(
        requests[4],
        ChangeRequest::EditPort {
            entity: String::from(".top.worker"),
            port: String::from("in"),
            edit: PortEdit::Rename(String::from("data")),
        }
    );
}

#[test]
fn listeners_hear_about_every_request() {
    let journal = Arc::new(Mutex::new(Journal::default()));
    let mut model = queued();
    model.add_change_listener(Box::new(JournalListener {
        journal: journal.clone(),
    }));
    assert_eq!(model.pending_changes().len(), 6);

    assert_eq!(model.execute_change_requests().unwrap(), 5);
    assert!(model.pending_changes().is_empty());
    let journal = journal.lock();
    assert_eq!(journal.executed.len(), 5);
    assert_eq!(journal.failed, vec!["AddTransition(.top:loop)"]);

    let root = model.root();
    let worker = model.entity_by_path(".top.worker").unwrap();
    assert_eq!(model.port_names(root).unwrap(), vec!["data"]);
    assert_eq!(model.port_names(worker).unwrap(), vec!["data"]);
    assert!(model.fsm(root).unwrap().transitions().is_empty());
    assert_eq!(model.parameter(root, "period"), Some("10"));
}

#[test]
fn without_listeners_the_first_failure_is_returned() {
    let mut model = queued();
    let result = model.execute_change_requests();
    assert!(matches!(result, Err(ModalError::StateNotFound(_))));
    // Later requests still ran
    let worker = model.entity_by_path(".top.worker").unwrap();
    assert_eq!(model.port_names(worker).unwrap(), vec!["data"]);
}

#[test]
fn failed_transition_requests_leave_no_trace() {
    let mut model = ModalModel::new("top").unwrap();
    let root = model.root();
    model.add_state(root, "idle").unwrap();
    model.request_change(ChangeRequest::AddTransition {
        modal: String::from(".top"),
        name: String::from("loop"),
        source: String::from("idle"),
        destination: String::from("idle"),
        guard: String::from("true"),
        output_actions: String::new(),
    });
    model.request_change(ChangeRequest::AddTransition {
        modal: String::from(".top"),
        name: String::from("loop"),
        source: String::from("idle"),
        destination: String::from("idle"),
        guard: String::new(),
        output_actions: String::new(),
    });
    let result = model.execute_change_requests();
    assert!(matches!(result, Err(ModalError::NameDuplication { .. })));
    let fsm = model.fsm(root).unwrap();
    assert_eq!(fsm.transitions().len(), 1);
    assert_eq!(fsm.transition("loop").unwrap().guard(), "true");
}

#[test]
fn unknown_paths_are_reported() {
    let mut model = ModalModel::new("top").unwrap();
    let request = ChangeRequest::RemoveRefinement {
        refinement: String::from(".top.ghost"),
    };
    assert!(matches!(request.execute(&mut model), Err(ModalError::EntityNotFound(_))));
    let request = ChangeRequest::AddState {
        modal: String::from(".elsewhere"),
        state: String::from("idle"),
    };
    assert!(matches!(request.execute(&mut model), Err(ModalError::EntityNotFound(_))));
}

#[test]
fn shared_models_serialize_access() {
    let shared = SharedModel::from(ModalModel::new("top").unwrap());
    let other = shared.clone();
    {
        let mut model = other.write();
        let root = model.root();
        model.add_state(root, "idle").unwrap();
    }
    let model = shared.read();
    assert_eq!(model.current_state(model.root()).unwrap().as_deref(), Some("idle"));
}
