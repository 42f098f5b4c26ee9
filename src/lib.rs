//! testflow
//!
//! Librería de instrumentación de tests:
//! - `facade` expone un lifecycle global y helpers (`step`, `attachment`,
//!   `label`, ...) para código de test.
//! - `config` carga la configuración desde `.env` / variables de entorno.
//! - `errors` agrupa los errores propios de la fachada.
//!
//! El motor vive en `testflow-core` y la persistencia en archivos en
//! `testflow-persistence`; ambos se re-exportan.

pub mod config;
pub mod errors;
pub mod facade;

pub use facade::{attachment, description, feature, install, install_from_env, install_lifecycle, issue, label, lifecycle, link,
                 log_step, parameter, severity, step, step_async, story, text_attachment, GlobalLifecycle};
pub use testflow_core;
pub use testflow_core::context;
pub use testflow_persistence;
