//! Engine del lifecycle: start/update/stop de containers, tests, fixtures y
//! steps sobre el contexto flow-local.

mod arena;
pub mod builder;
pub mod core;

pub use builder::LifecycleBuilder;
pub use self::core::Lifecycle;
