//! Modelos planos (sin comportamiento) que describen el árbol de resultados.

pub mod attachment;
pub mod label;
pub mod results;
pub mod status;

pub use attachment::{attachment_source, Attachment};
pub use label::{Label, Link, Parameter};
pub use results::{ContainerResult, ExecutableItem, FixtureKind, FixtureResult, StepResult, TestResult};
pub use status::{Stage, Status, StatusDetails};
