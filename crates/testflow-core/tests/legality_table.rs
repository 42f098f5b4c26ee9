//! Recorre la tabla de legalidad completa contra el engine real: para cada
//! fase y cada transición, el resultado del engine debe coincidir con la
//! celda de la tabla, y una transición rechazada no debe mutar el contexto.

use testflow_core::context::{self, legality, FlowContext, Legality, Phase, Transition};
use testflow_core::{InMemoryResultSink, Lifecycle, LifecycleError, TestResult};

fn enter(lc: &Lifecycle<InMemoryResultSink>, phase: Phase) {
    match phase {
        Phase::Idle => {}
        Phase::Container => {
            lc.start_container("c").expect("container");
        }
        Phase::Test => {
            enter(lc, Phase::Container);
            lc.start_test_case(TestResult::new("t")).expect("test");
        }
        Phase::TestStep => {
            enter(lc, Phase::Test);
            lc.start_step("s").expect("step");
        }
        Phase::Fixture => {
            enter(lc, Phase::Container);
            lc.start_before_fixture("f").expect("fixture");
        }
        Phase::FixtureStep => {
            enter(lc, Phase::Fixture);
            lc.start_step("s").expect("step");
        }
    }
    assert_eq!(context::snapshot().phase(), phase);
}

fn attempt(lc: &Lifecycle<InMemoryResultSink>, transition: Transition) -> Result<(), LifecycleError> {
    match transition {
        Transition::StartContainer => lc.start_container("other").map(|_| ()),
        Transition::StopContainer => lc.stop_container(),
        Transition::StartTest => lc.start_test_case(TestResult::new("other")).map(|_| ()),
        Transition::StopTest => lc.stop_test_case(|_| {}),
        Transition::StartFixture => lc.start_after_fixture("other").map(|_| ()),
        Transition::StopFixture => lc.stop_fixture(|_| {}),
        Transition::StartStep => lc.start_step("other").map(|_| ()),
        Transition::StopStep => lc.stop_step(|_| {}),
    }
}

fn classify(res: &Result<(), LifecycleError>) -> Legality {
    match res {
        Ok(()) => Legality::Allowed,
        Err(LifecycleError::IllegalState(_)) => Legality::IllegalState,
        Err(LifecycleError::NoActiveContext(_)) => Legality::NoActiveContext,
        Err(other) => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn engine_matches_legality_table_for_every_cell() {
    for phase in Phase::ALL {
        for transition in Transition::ALL {
            context::scope_sync(FlowContext::new(), || {
                let lc = Lifecycle::new(InMemoryResultSink::new());
                enter(&lc, phase);
                let before = context::snapshot();
                let live_before = lc.live_items();

                let res = attempt(&lc, transition);
                let expected = legality(transition, phase);
                assert_eq!(classify(&res), expected, "{transition:?} in {phase:?} returned {res:?}");

                if expected != Legality::Allowed {
                    assert_eq!(context::snapshot(), before, "{transition:?} in {phase:?} mutated the context");
                    assert_eq!(lc.live_items(), live_before, "{transition:?} in {phase:?} touched the arena");
                }
            });
        }
    }
}

#[test]
fn every_phase_is_reachable() {
    for phase in Phase::ALL {
        context::scope_sync(FlowContext::new(), || {
            let lc = Lifecycle::new(InMemoryResultSink::new());
            enter(&lc, phase);
        });
    }
}
