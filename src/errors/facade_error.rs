use testflow_core::LifecycleError;
use testflow_persistence::PersistenceError;
use thiserror::Error;

/// Errores de la fachada global.
#[derive(Debug, Error)]
pub enum FacadeError {
    #[error("a lifecycle is already installed")]
    AlreadyInstalled,
    #[error("Error de persistencia: {0}")]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}
