//! Fachada global para código de test.
//!
//! Mantiene un único `Lifecycle` por proceso. Si nadie instaló uno, el
//! primer uso crea el de por defecto: un `FileSystemResultSink` sobre
//! `CONFIG.results`. Todas las funciones delegan en el engine sobre el
//! contexto del flujo actual, así que pueden llamarse desde cualquier hilo
//! o tarea que un adapter haya preparado.
//!
//! No llamar a la fachada desde dentro de un closure de `update_*` del
//! lifecycle: el item está bloqueado y la llamada falla con `IllegalState`.

use std::fmt;
use std::future::Future;

use log::{debug, error};
use once_cell::sync::OnceCell;
use testflow_core::{InMemoryResultSink, Label, Lifecycle, LifecycleError, Link, Parameter, ResultSink, Status, TrackedError};
use testflow_persistence::FileSystemResultSink;

use crate::config::CONFIG;
use crate::errors::FacadeError;

pub type GlobalLifecycle = Lifecycle<Box<dyn ResultSink>>;

static LIFECYCLE: OnceCell<GlobalLifecycle> = OnceCell::new();

/// Instala el lifecycle global con `sink`. Sólo puede hacerse una vez y
/// antes del primer uso de la fachada.
pub fn install(sink: impl ResultSink + 'static) -> Result<&'static GlobalLifecycle, FacadeError> {
    let sink: Box<dyn ResultSink> = Box::new(sink);
    install_lifecycle(Lifecycle::new(sink))
}

/// Instala un lifecycle ya construido (por ejemplo con listeners).
pub fn install_lifecycle(lifecycle: GlobalLifecycle) -> Result<&'static GlobalLifecycle, FacadeError> {
    LIFECYCLE.set(lifecycle).map_err(|_| FacadeError::AlreadyInstalled)?;
    debug!("global lifecycle installed");
    Ok(lifecycle_ref())
}

/// Instala el sink de archivos descrito por `CONFIG`.
pub fn install_from_env() -> Result<&'static GlobalLifecycle, FacadeError> {
    let sink = FileSystemResultSink::new(CONFIG.results.clone())?;
    install(sink)
}

fn default_lifecycle() -> GlobalLifecycle {
    let sink: Box<dyn ResultSink> = match FileSystemResultSink::new(CONFIG.results.clone()) {
        Ok(fs) => Box::new(fs),
        Err(e) => {
            error!("cannot open results dir, results will only be kept in memory: {e}");
            Box::new(InMemoryResultSink::new())
        }
    };
    Lifecycle::new(sink)
}

fn lifecycle_ref() -> &'static GlobalLifecycle { LIFECYCLE.get_or_init(default_lifecycle) }

/// Lifecycle global; lo crea con la configuración por defecto si hace falta.
pub fn lifecycle() -> &'static GlobalLifecycle { lifecycle_ref() }

pub fn step<T, E>(name: &str, body: impl FnOnce() -> Result<T, E>) -> Result<T, TrackedError<E>>
    where E: fmt::Display + fmt::Debug
{
    lifecycle().step(name, body)
}

pub async fn step_async<T, E, Fut>(name: &str, body: Fut) -> Result<T, TrackedError<E>>
    where Fut: Future<Output = Result<T, E>>,
          E: fmt::Display + fmt::Debug
{
    lifecycle().step_async(name, body).await
}

/// Registra un step sin cuerpo con el estado dado.
pub fn log_step(name: &str, status: Status) -> Result<(), LifecycleError> {
    let lc = lifecycle();
    lc.start_step(name)?;
    lc.stop_step(|s| s.item.status = status)
}

/// Adjunta `bytes` al item más interno del flujo; devuelve la clave.
pub fn attachment(name: &str, mime: Option<&str>, extension: &str, bytes: &[u8]) -> Result<String, LifecycleError> {
    lifecycle().add_attachment(name, mime, extension, bytes)
}

pub fn text_attachment(name: &str, content: &str) -> Result<String, LifecycleError> {
    attachment(name, Some("text/plain"), "txt", content.as_bytes())
}

pub fn label(name: &str, value: &str) -> Result<(), LifecycleError> {
    lifecycle().update_test_case(|t| t.add_label(Label::new(name, value)))
}

pub fn severity(value: &str) -> Result<(), LifecycleError> { lifecycle().update_test_case(|t| t.set_label("severity", value)) }

pub fn feature(value: &str) -> Result<(), LifecycleError> { label("feature", value) }

pub fn story(value: &str) -> Result<(), LifecycleError> { label("story", value) }

pub fn link(name: &str, url: &str) -> Result<(), LifecycleError> {
    lifecycle().update_test_case(|t| t.links.push(Link::new(name, url)))
}

pub fn issue(name: &str, url: &str) -> Result<(), LifecycleError> {
    lifecycle().update_test_case(|t| t.links.push(Link::issue(name, url)))
}

/// Parámetro del step activo o, si no hay, del fixture o test.
pub fn parameter(name: &str, value: impl ToString) -> Result<(), LifecycleError> {
    let value = value.to_string();
    lifecycle().update_executable_item(|item| item.parameters.push(Parameter::new(name, value)))
}

pub fn description(text: &str) -> Result<(), LifecycleError> {
    lifecycle().update_test_case(|t| t.item.description = Some(text.to_string()))
}
