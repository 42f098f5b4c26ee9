//! Contrato del `ResultSink`: persistencia durable de items terminados y de
//! los bytes de attachments.
//!
//! El sink es el único recurso que escriben varios flujos a la vez. Las
//! claves (uuid de items, `source` de attachments) son únicas por
//! construcción, así que las implementaciones no necesitan secciones
//! críticas visibles para el llamador.

mod in_memory;

use std::sync::Arc;

use uuid::Uuid;

use crate::errors::SinkError;
use crate::model::{ContainerResult, FixtureResult, TestResult};

pub use in_memory::InMemoryResultSink;

/// Item terminado que el engine entrega al sink. El sink pasa a ser dueño
/// de la copia durable; el engine no conserva referencias.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistedResult {
    Test(TestResult),
    Fixture(FixtureResult),
    Container(ContainerResult),
}

impl PersistedResult {
    pub fn uuid(&self) -> Uuid {
        match self {
            PersistedResult::Test(t) => t.uuid,
            PersistedResult::Fixture(f) => f.uuid,
            PersistedResult::Container(c) => c.uuid,
        }
    }
}

pub trait ResultSink: Send + Sync {
    /// Escribe los bytes de un attachment bajo `key`.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), SinkError>;
    /// Persiste un item terminado.
    fn persist(&self, item: PersistedResult) -> Result<(), SinkError>;
}

impl<T: ResultSink + ?Sized> ResultSink for Arc<T> {
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), SinkError> { (**self).write(key, bytes) }
    fn persist(&self, item: PersistedResult) -> Result<(), SinkError> { (**self).persist(item) }
}

impl<T: ResultSink + ?Sized> ResultSink for Box<T> {
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), SinkError> { (**self).write(key, bytes) }
    fn persist(&self, item: PersistedResult) -> Result<(), SinkError> { (**self).persist(item) }
}
