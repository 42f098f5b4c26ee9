//! Helpers de resultado para el wrapper de ejecución.
//!
//! El llamador elige la semántica de fallo componiendo con uno de estos
//! helpers: `failed()` (todo error cuenta como fallo), `broken()` (todo
//! error es inesperado) o `classified()` (panic = aserción fallida, error
//! devuelto = inesperado).
use std::any::Any;
use std::fmt;

use crate::model::{ExecutableItem, Status, StatusDetails};

/// Descripción del fallo observado en el body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub message: String,
    pub trace: Option<String>,
    /// `true` si el body terminó con un panic en lugar de devolver `Err`.
    pub panicked: bool,
}

impl Failure {
    pub fn from_error<E: fmt::Display + fmt::Debug>(error: &E) -> Self {
        Self { message: error.to_string(),
               trace: Some(format!("{error:?}")),
               panicked: false }
    }

    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with a non-string payload".to_string()
        };
        Self { message,
               trace: None,
               panicked: true }
    }

    pub fn details(&self) -> StatusDetails {
        StatusDetails { message: Some(self.message.clone()),
                        trace: self.trace.clone(),
                        ..StatusDetails::default() }
    }
}

pub fn passed() -> impl FnOnce(&mut ExecutableItem) { |item: &mut ExecutableItem| item.set_status(Status::Passed) }

pub fn failed() -> impl FnOnce(&mut ExecutableItem, &Failure) {
    |item: &mut ExecutableItem, failure: &Failure| item.fail_with(Status::Failed, failure.details())
}

pub fn broken() -> impl FnOnce(&mut ExecutableItem, &Failure) {
    |item: &mut ExecutableItem, failure: &Failure| item.fail_with(Status::Broken, failure.details())
}

pub fn classified() -> impl FnOnce(&mut ExecutableItem, &Failure) {
    |item: &mut ExecutableItem, failure: &Failure| {
        let status = if failure.panicked { Status::Failed } else { Status::Broken };
        item.fail_with(status, failure.details())
    }
}
