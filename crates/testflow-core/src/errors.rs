//! Errores del core: violaciones de anidamiento, contexto ausente y fallos
//! del código envuelto.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Errores del lifecycle. Siempre son errores de programación del adapter
/// que llama al engine; nunca se reintentan.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum LifecycleError {
    #[error("illegal state: {0}")] IllegalState(String),
    #[error("no active context: {0}")] NoActiveContext(String),
    #[error("item {0} is not running (never started or already stopped)")] ItemNotRunning(Uuid),
}

impl LifecycleError {
    pub fn illegal(msg: impl Into<String>) -> Self { Self::IllegalState(msg.into()) }

    pub fn no_context(msg: impl Into<String>) -> Self { Self::NoActiveContext(msg.into()) }
}

/// Errores del colaborador de persistencia. El engine sólo los registra en
/// el log; no alteran el estado del lifecycle.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SinkError {
    #[error("io: {0}")] Io(String),
    #[error("serialization: {0}")] Serialization(String),
    #[error("sink: {0}")] Other(String),
}

/// Tipo de item que ejecuta el wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedKind {
    Step,
    BeforeFixture,
    AfterFixture,
}

impl fmt::Display for TrackedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackedKind::Step => f.write_str("step"),
            TrackedKind::BeforeFixture => f.write_str("before fixture"),
            TrackedKind::AfterFixture => f.write_str("after fixture"),
        }
    }
}

/// Error devuelto por el wrapper de ejecución.
///
/// `Body` conserva el error original como `source` y sólo lo anota con el
/// nombre del step/fixture.
#[derive(Debug, Error)]
pub enum TrackedError<E> {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("{kind} '{name}' failed: {source}")]
    Body {
        name: String,
        kind: TrackedKind,
        #[source]
        source: E,
    },
}

impl<E> TrackedError<E> {
    /// Devuelve el error original del body, si lo hay.
    pub fn into_body(self) -> Option<E> {
        match self {
            TrackedError::Body { source, .. } => Some(source),
            TrackedError::Lifecycle(_) => None,
        }
    }

    pub fn body(&self) -> Option<&E> {
        match self {
            TrackedError::Body { source, .. } => Some(source),
            TrackedError::Lifecycle(_) => None,
        }
    }

    pub fn lifecycle(&self) -> Option<&LifecycleError> {
        match self {
            TrackedError::Lifecycle(e) => Some(e),
            TrackedError::Body { .. } => None,
        }
    }
}
