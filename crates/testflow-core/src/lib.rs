//! testflow-core: motor de lifecycle para instrumentar la ejecución de tests.
//!
//! - `context`: qué está activo en cada flujo lógico (hilo o tarea async).
//! - `engine`: máquina de estados start/update/stop sobre ese contexto.
//! - `execution`: wrapper que corre código como step/fixture rastreado.
//! - `sink`: contrato de persistencia de resultados.
pub mod constants;
pub mod context;
pub mod engine;
pub mod errors;
pub mod event;
pub mod execution;
pub mod hashing;
pub mod model;
pub mod sink;

pub use context::{FlowContext, Phase, Transition};
pub use engine::{Lifecycle, LifecycleBuilder};
pub use errors::{LifecycleError, SinkError, TrackedError, TrackedKind};
pub use event::{CompositeListener, InMemoryEventLog, LifecycleEvent, LifecycleEventKind, LifecycleListener};
pub use execution::Failure;
pub use model::{Attachment, ContainerResult, ExecutableItem, FixtureKind, FixtureResult, Label, Link, Parameter, Stage, Status,
                StatusDetails, StepResult, TestResult};
pub use sink::{InMemoryResultSink, PersistedResult, ResultSink};

#[cfg(test)]
mod tests {
    use super::*;

    // Escenario base: T { A { B } }, todo passed.
    #[test]
    fn nested_steps_mirror_call_order() {
        context::reset();
        let lc = Lifecycle::new(InMemoryResultSink::new());
        lc.start_container("suite").expect("container");
        let test = lc.start_test_case(TestResult::new("T")).expect("test");
        lc.start_step("A").expect("A");
        lc.start_step("B").expect("B");
        lc.stop_step(|s| s.item.status = Status::Passed).expect("stop B");
        lc.stop_step(|s| s.item.status = Status::Passed).expect("stop A");
        lc.stop_test_case(|t| t.item.status = Status::Passed).expect("stop T");
        lc.stop_container().expect("stop container");

        let t = lc.sink().test(test).expect("persisted test");
        assert_eq!(t.item.status, Status::Passed);
        assert_eq!(t.item.steps.len(), 1);
        let a = &t.item.steps[0];
        assert_eq!(a.item.name, "A");
        assert_eq!(a.item.status, Status::Passed);
        assert_eq!(a.item.steps.len(), 1);
        assert_eq!(a.item.steps[0].item.name, "B");
        assert_eq!(a.item.steps[0].item.status, Status::Passed);
        assert!(a.item.steps[0].item.steps.is_empty());
        assert_eq!(lc.live_items(), 0, "nothing stays live after stop");
        context::reset();
    }
}
