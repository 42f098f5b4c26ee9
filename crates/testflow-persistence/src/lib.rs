//! testflow-persistence
//!
//! Implementación de `ResultSink` sobre el sistema de archivos: un JSON por
//! test, fixture y container, y los bytes de cada attachment bajo su clave.
//!
//! Módulos:
//! - `fs`: el sink de archivos y helpers de lectura.
//! - `config`: carga de configuración desde .env / variables de entorno.
//! - `error`: errores de persistencia y su conversión a `SinkError`.

pub mod config;
pub mod error;
pub mod fs;

pub use config::{init_dotenv, ResultsConfig};
pub use error::PersistenceError;
pub use fs::FileSystemResultSink;
