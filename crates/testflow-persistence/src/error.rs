//! Errores de persistencia.
//! Mapea errores de IO / serde a variantes semánticas y de ahí a `SinkError`.

use std::io;
use std::path::PathBuf;

use testflow_core::SinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid key: {0:?}")]
    InvalidKey(String),
    #[error("key already written: {0}")]
    AlreadyExists(String),
}

impl PersistenceError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(),
                   source }
    }

    /// Errores transitorios del sistema de archivos que vale la pena
    /// reintentar.
    pub fn is_retryable(&self) -> bool {
        match self {
            PersistenceError::Io { source, .. } => {
                matches!(source.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
            }
            _ => false,
        }
    }
}

impl From<PersistenceError> for SinkError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Io { .. } => SinkError::Io(err.to_string()),
            PersistenceError::Serialization(e) => SinkError::Serialization(e.to_string()),
            other => SinkError::Other(other.to_string()),
        }
    }
}
