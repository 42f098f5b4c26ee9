//! Contexto flow-local: qué container, fixture, test y steps están activos
//! para el flujo de ejecución actual.

pub mod flow;
pub mod propagation;

pub use flow::{legality, FlowContext, Legality, Phase, Transition, LEGALITY};
pub use propagation::{fork, reset, scope, scope_sync, snapshot, spawn_flow, spawn_thread_flow, with_flow};
