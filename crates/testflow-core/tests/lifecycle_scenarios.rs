//! Escenarios de punta a punta del engine sobre un sink en memoria.

use std::sync::Arc;

use testflow_core::constants::UNSTOPPED_STEP_MESSAGE;
use testflow_core::context::{self, FlowContext};
use testflow_core::model::FixtureKind;
use testflow_core::{InMemoryEventLog, InMemoryResultSink, Label, Lifecycle, LifecycleError, Parameter, Stage, Status, TestResult};

fn engine() -> Lifecycle<InMemoryResultSink> { Lifecycle::new(InMemoryResultSink::new()) }

fn fresh<R>(f: impl FnOnce() -> R) -> R { context::scope_sync(FlowContext::new(), f) }

#[test]
fn stop_step_without_open_step_fails_and_leaves_state_untouched() {
    fresh(|| {
        let lc = engine();
        lc.start_container("c").unwrap();
        let test = lc.start_test_case(TestResult::new("T")).unwrap();
        let before = context::snapshot();

        let err = lc.stop_step(|s| s.item.status = Status::Passed).unwrap_err();
        assert!(matches!(err, LifecycleError::NoActiveContext(_)));
        assert_eq!(context::snapshot(), before);
        assert_eq!(lc.current_test_case(), Some(test));

        lc.stop_test_case(|t| t.item.status = Status::Passed).unwrap();
        assert!(lc.sink().test(test).unwrap().item.steps.is_empty());
    });
}

#[test]
fn second_fixture_is_rejected_and_first_stays_active() {
    fresh(|| {
        let lc = engine();
        lc.start_container("c").unwrap();
        let first = lc.start_before_fixture("db").unwrap();

        let err = lc.start_before_fixture("cache").unwrap_err();
        assert!(matches!(err, LifecycleError::IllegalState(_)));
        assert_eq!(lc.current_fixture(), Some(first));
        assert_eq!(lc.live_items(), 2, "container + first fixture only");

        lc.stop_fixture(|f| f.item.status = Status::Passed).unwrap();
        let stored = lc.sink().fixture(first).unwrap();
        assert_eq!(stored.item.name, "db");
        assert_eq!(stored.kind, FixtureKind::Before);
    });
}

#[test]
fn failing_fixture_is_recorded_and_the_flow_can_continue() {
    fresh(|| {
        let lc = engine();
        let container = lc.start_container("c").unwrap();

        let res = lc.before_fixture("connect", || Err::<(), _>(std::io::Error::other("refused")));
        let err = res.unwrap_err();
        assert_eq!(err.body().map(|e| e.to_string()), Some("refused".to_string()));
        assert_eq!(lc.current_fixture(), None);

        let stored = lc.sink().fixtures();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].item.status, Status::Failed);
        assert_eq!(stored[0].item.status_details.as_ref().and_then(|d| d.message.as_deref()), Some("refused"));

        let retry = lc.start_before_fixture("connect-again");
        assert!(retry.is_ok());
        lc.stop_fixture(|f| f.item.status = Status::Passed).unwrap();
        lc.stop_container().unwrap();

        let c = lc.sink().container(container).unwrap();
        assert_eq!(c.befores.len(), 2);
        assert!(c.stop.is_some());
    });
}

#[test]
fn updates_after_stop_fail_loudly() {
    fresh(|| {
        let lc = engine();
        lc.start_container("c").unwrap();
        let test = lc.start_test_case(TestResult::new("T")).unwrap();
        let step = lc.start_step("A").unwrap();
        lc.stop_step(|s| s.item.status = Status::Passed).unwrap();

        let err = lc.update_item(step, |i| i.name = "renamed".into()).unwrap_err();
        assert_eq!(err, LifecycleError::ItemNotRunning(step));

        lc.stop_test_case(|_| {}).unwrap();
        assert!(matches!(lc.update_test_case(|_| {}), Err(LifecycleError::NoActiveContext(_))));
        assert_eq!(lc.update_item(test, |_| {}), Err(LifecycleError::ItemNotRunning(test)));
        assert_eq!(lc.sink().test(test).unwrap().item.steps[0].item.name, "A");
    });
}

#[test]
fn stopping_a_test_closes_its_open_steps_as_broken() {
    fresh(|| {
        let lc = engine();
        lc.start_container("c").unwrap();
        let test = lc.start_test_case(TestResult::new("T")).unwrap();
        lc.start_step("outer").unwrap();
        lc.start_step("inner").unwrap();
        lc.stop_test_case(|t| t.item.status = Status::Passed).unwrap();

        assert!(context::snapshot().steps().is_empty());
        let t = lc.sink().test(test).unwrap();
        let outer = &t.item.steps[0];
        assert_eq!(outer.item.status, Status::Broken);
        assert_eq!(outer.item.status_details.as_ref().and_then(|d| d.message.as_deref()), Some(UNSTOPPED_STEP_MESSAGE));
        assert_eq!(outer.item.steps[0].item.name, "inner");
        assert_eq!(outer.item.steps[0].item.status, Status::Broken);
        assert_eq!(lc.live_items(), 1, "only the container remains");
    });
}

#[test]
fn fixture_started_during_a_test_takes_over_the_step_stack() {
    fresh(|| {
        let lc = engine();
        lc.start_container("c").unwrap();
        let test = lc.start_test_case(TestResult::new("T")).unwrap();
        lc.start_step("left open").unwrap();

        let fixture = lc.start_after_fixture("cleanup").unwrap();
        lc.start_step("drop tables").unwrap();
        lc.stop_step(|s| s.item.status = Status::Passed).unwrap();
        lc.stop_fixture(|f| f.item.status = Status::Passed).unwrap();

        let f = lc.sink().fixture(fixture).unwrap();
        assert_eq!(f.item.steps.len(), 1);
        assert_eq!(f.item.steps[0].item.name, "drop tables");

        lc.stop_test_case(|t| t.item.status = Status::Passed).unwrap();
        let t = lc.sink().test(test).unwrap();
        assert_eq!(t.item.steps.len(), 1);
        assert_eq!(t.item.steps[0].item.status, Status::Broken);
    });
}

#[test]
fn stop_step_by_closes_the_steps_above_it() {
    fresh(|| {
        let lc = engine();
        lc.start_container("c").unwrap();
        let test = lc.start_test_case(TestResult::new("T")).unwrap();
        let a = lc.start_step("A").unwrap();
        lc.start_step("B").unwrap();
        lc.start_step("C").unwrap();

        lc.stop_step_by(a, |s| s.item.status = Status::Passed).unwrap();
        assert!(context::snapshot().steps().is_empty());

        lc.stop_test_case(|_| {}).unwrap();
        let t = lc.sink().test(test).unwrap();
        let a = &t.item.steps[0];
        assert_eq!(a.item.status, Status::Passed);
        let b = &a.item.steps[0];
        assert_eq!((b.item.name.as_str(), b.item.status), ("B", Status::Broken));
        assert_eq!(b.item.steps[0].item.name, "C");
    });
}

#[test]
fn stop_step_by_rejects_unknown_uuid() {
    fresh(|| {
        let lc = engine();
        lc.start_container("c").unwrap();
        lc.start_test_case(TestResult::new("T")).unwrap();
        lc.start_step("A").unwrap();
        let stranger = uuid::Uuid::new_v4();
        assert_eq!(lc.stop_step_by(stranger, |_| {}), Err(LifecycleError::ItemNotRunning(stranger)));
        assert_eq!(context::snapshot().steps().len(), 1);
    });
}

#[test]
fn test_results_carry_metadata_and_history_id() {
    fresh(|| {
        let lc = engine();
        let container = lc.start_container("suite").unwrap();
        let login = TestResult::new("login works").with_full_name("auth::login_works")
                                                 .with_label(Label::suite("auth"))
                                                 .with_parameter(Parameter::new("user", "admin"));
        let test = lc.start_test_case(login).unwrap();
        lc.update_test_case(|t| t.set_label("severity", "critical")).unwrap();
        lc.update_executable_item(|i| i.description = Some("checks login".into())).unwrap();
        lc.stop_test_case(|t| t.item.status = Status::Passed).unwrap();
        lc.stop_container().unwrap();

        let t = lc.sink().test(test).unwrap();
        assert_eq!(t.label_values("severity"), vec!["critical"]);
        assert_eq!(t.label_values("suite"), vec!["auth"]);
        assert_eq!(t.item.description.as_deref(), Some("checks login"));
        assert_eq!(t.item.stage, Stage::Finished);
        assert!(t.item.stop.is_some_and(|stop| stop >= t.item.start));
        assert_eq!(t.history_id.as_ref().map(String::len), Some(64));
        assert_eq!(lc.sink().container(container).unwrap().children, vec![test]);
    });
}

#[test]
fn same_name_and_parameters_share_history_id() {
    fresh(|| {
        let lc = engine();
        lc.start_container("c").unwrap();
        let mut ids = Vec::new();
        for _ in 0..2 {
            let t = lc.start_test_case(TestResult::new("t").with_parameter(Parameter::new("n", "1"))).unwrap();
            lc.stop_test_case(|_| {}).unwrap();
            ids.push(lc.sink().test(t).unwrap().history_id);
        }
        let other = lc.start_test_case(TestResult::new("t").with_parameter(Parameter::new("n", "2"))).unwrap();
        lc.stop_test_case(|_| {}).unwrap();

        assert_eq!(ids[0], ids[1]);
        assert_ne!(ids[0], lc.sink().test(other).unwrap().history_id);
    });
}

#[test]
fn attachments_go_to_the_innermost_item() {
    fresh(|| {
        let lc = engine();
        lc.start_container("c").unwrap();
        let test = lc.start_test_case(TestResult::new("T")).unwrap();
        let on_test = lc.add_attachment("log", Some("text/plain"), "txt", b"hello").unwrap();
        lc.start_step("A").unwrap();
        let on_step = lc.add_attachment("shot", Some("image/png"), "png", &[0x89, 0x50]).unwrap();
        lc.stop_step(|_| {}).unwrap();
        lc.stop_test_case(|_| {}).unwrap();

        assert!(on_test.ends_with("-attachment.txt"));
        assert!(on_step.ends_with("-attachment.png"));
        assert_eq!(lc.sink().attachment(&on_test), Some(b"hello".to_vec()));

        let t = lc.sink().test(test).unwrap();
        assert_eq!(t.item.attachments.len(), 1);
        assert_eq!(t.item.attachments[0].source, on_test);
        assert_eq!(t.item.steps[0].item.attachments[0].source, on_step);
        assert_eq!(t.item.steps[0].item.attachments[0].mime.as_deref(), Some("image/png"));
    });
}

#[test]
fn attachment_without_context_is_rejected() {
    fresh(|| {
        let lc = engine();
        assert!(matches!(lc.add_attachment("x", None, "txt", b"x"), Err(LifecycleError::NoActiveContext(_))));
        assert!(lc.sink().attachment_keys().is_empty());
    });
}

#[test]
fn listeners_see_events_in_order() {
    fresh(|| {
        let log = Arc::new(InMemoryEventLog::new());
        let lc = Lifecycle::builder(InMemoryResultSink::new()).listener(log.clone()).build();
        lc.start_container("c").unwrap();
        let test = lc.start_test_case(TestResult::new("T")).unwrap();
        lc.step_fn("A", || ()).unwrap();
        lc.add_attachment("a", None, "txt", b"x").unwrap();
        lc.stop_test_case(|_| {}).unwrap();
        lc.stop_container().unwrap();

        assert_eq!(log.codes_for(test), vec!["T+", "S+", "S-", "A", "T-"]);
        assert_eq!(log.len(), 7);
    });
}

#[test]
fn update_fixture_edits_the_live_fixture() {
    fresh(|| {
        let lc = engine();
        lc.start_container("c").unwrap();
        let fixture = lc.start_before_fixture("db").unwrap();
        lc.update_fixture(|f| {
              f.item.parameters.push(Parameter::new("url", "postgres://localhost"));
              f.item.description = Some("opens the pool".into());
          })
          .unwrap();
        lc.stop_fixture(|f| f.item.status = Status::Passed).unwrap();

        let f = lc.sink().fixture(fixture).unwrap();
        assert_eq!(f.item.parameters, vec![Parameter::new("url", "postgres://localhost")]);
        assert_eq!(f.item.description.as_deref(), Some("opens the pool"));
        assert_eq!(f.item.status, Status::Passed);
    });
}

#[test]
fn update_step_targets_the_innermost_step() {
    fresh(|| {
        let lc = engine();
        lc.start_container("c").unwrap();
        let test = lc.start_test_case(TestResult::new("T")).unwrap();
        lc.start_step("outer").unwrap();
        lc.start_step("inner").unwrap();
        lc.update_step(|s| s.item.description = Some("edited".into())).unwrap();
        lc.stop_step(|_| {}).unwrap();
        lc.stop_step(|_| {}).unwrap();
        lc.stop_test_case(|_| {}).unwrap();

        let t = lc.sink().test(test).unwrap();
        let outer = &t.item.steps[0];
        assert_eq!(outer.item.description, None);
        assert_eq!(outer.item.steps[0].item.name, "inner");
        assert_eq!(outer.item.steps[0].item.description.as_deref(), Some("edited"));
    });
}

#[test]
fn fixture_and_step_updates_need_an_active_item() {
    fresh(|| {
        let lc = engine();
        assert!(matches!(lc.update_fixture(|_| {}), Err(LifecycleError::NoActiveContext(_))));
        assert!(matches!(lc.update_step(|_| {}), Err(LifecycleError::NoActiveContext(_))));

        lc.start_container("c").unwrap();
        lc.start_test_case(TestResult::new("T")).unwrap();
        assert!(matches!(lc.update_step(|_| {}), Err(LifecycleError::NoActiveContext(_))));
        assert!(matches!(lc.update_fixture(|_| {}), Err(LifecycleError::NoActiveContext(_))));
    });
}

#[test]
fn container_updates_reach_the_persisted_container() {
    fresh(|| {
        let lc = engine();
        let container = lc.start_container("draft").unwrap();
        lc.update_container(|c| c.name = "auth suite".into()).unwrap();
        lc.stop_container().unwrap();

        assert_eq!(lc.sink().container(container).unwrap().name, "auth suite");
        assert!(matches!(lc.update_container(|_| {}), Err(LifecycleError::NoActiveContext(_))));
    });
}

#[test]
fn prepared_attachment_gets_its_bytes_later() {
    fresh(|| {
        let lc = engine();
        lc.start_container("c").unwrap();
        let test = lc.start_test_case(TestResult::new("T")).unwrap();
        let source = lc.prepare_attachment("trace", Some("application/json"), "json").unwrap();
        assert!(source.ends_with("-attachment.json"));
        assert_eq!(lc.sink().attachment(&source), None, "no bytes until written");

        lc.write_attachment(&source, br#"{"ok":true}"#);
        lc.stop_test_case(|_| {}).unwrap();

        assert_eq!(lc.sink().attachment(&source), Some(br#"{"ok":true}"#.to_vec()));
        let t = lc.sink().test(test).unwrap();
        assert_eq!(t.item.attachments.len(), 1);
        assert_eq!(t.item.attachments[0].name, "trace");
        assert_eq!(t.item.attachments[0].source, source);
    });
}

#[test]
fn test_stopped_by_a_sub_flow_does_not_strand_the_parent() {
    fresh(|| {
        let lc = Arc::new(engine());
        let container = lc.start_container("c").unwrap();
        let test = lc.start_test_case(TestResult::new("T")).unwrap();

        let child_lc = lc.clone();
        let child = context::spawn_thread_flow(move || child_lc.stop_test_case(|t| t.item.status = Status::Passed));
        assert_eq!(child.join().expect("sub-flow"), Ok(()));

        assert_eq!(lc.stop_test_case(|_| {}), Err(LifecycleError::ItemNotRunning(test)));
        assert_eq!(lc.current_test_case(), None);
        let next = lc.start_test_case(TestResult::new("T2")).unwrap();
        lc.stop_test_case(|_| {}).unwrap();
        lc.stop_container().unwrap();

        assert_eq!(lc.sink().test(test).unwrap().item.status, Status::Passed);
        assert_eq!(lc.sink().container(container).unwrap().children, vec![test, next]);
    });
}

#[test]
fn fixture_stopped_by_a_sub_flow_does_not_strand_the_parent() {
    fresh(|| {
        let lc = Arc::new(engine());
        lc.start_container("c").unwrap();
        let fixture = lc.start_before_fixture("db").unwrap();

        let child_lc = lc.clone();
        let child = context::spawn_thread_flow(move || child_lc.stop_fixture(|f| f.item.status = Status::Passed));
        assert_eq!(child.join().expect("sub-flow"), Ok(()));

        assert_eq!(lc.stop_fixture(|_| {}), Err(LifecycleError::ItemNotRunning(fixture)));
        assert_eq!(lc.current_fixture(), None);
        assert!(lc.start_before_fixture("cache").is_ok());
    });
}

#[test]
fn lifecycle_calls_inside_an_update_closure_fail_without_blocking() {
    fresh(|| {
        let lc = engine();
        lc.start_container("c").unwrap();
        let test = lc.start_test_case(TestResult::new("T")).unwrap();

        let mut out = None;
        lc.update_test_case(|t| {
              t.item.description = Some("outer edit".into());
              out = Some((lc.add_attachment("log", None, "txt", b"x"),
                          lc.start_step("nested"),
                          lc.stop_test_case(|_| {})));
          })
          .unwrap();
        let (attach, step, stop) = out.unwrap();
        assert!(matches!(attach, Err(LifecycleError::IllegalState(_))));
        assert!(matches!(step, Err(LifecycleError::IllegalState(_))));
        assert!(matches!(stop, Err(LifecycleError::IllegalState(_))));
        assert_eq!(lc.current_test_case(), Some(test));
        assert!(context::snapshot().steps().is_empty());

        lc.add_attachment("log", None, "txt", b"x").unwrap();
        lc.stop_test_case(|_| {}).unwrap();
        let t = lc.sink().test(test).unwrap();
        assert_eq!(t.item.description.as_deref(), Some("outer edit"));
        assert_eq!(t.item.attachments.len(), 1);
        assert!(t.item.steps.is_empty());
    });
}
