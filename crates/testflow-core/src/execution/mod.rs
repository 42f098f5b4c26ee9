//! Wrapper de ejecución: corre código arbitrario como step o fixture
//! rastreado y deriva su estado del resultado.
//!
//! Orden garantizado:
//! 1. `start` (si falla, el body no se ejecuta).
//! 2. body. En la variante async es el único punto de suspensión.
//! 3. `on_pass` / `on_fail` y `stop`, antes de devolver el control.
//!
//! Un `Err` del body se devuelve envuelto en `TrackedError::Body`, que
//! conserva el error original como `source`. Un panic se registra igual que
//! un error y luego se re-lanza con el payload original.

pub mod outcome;

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use log::error;
use uuid::Uuid;

use crate::engine::Lifecycle;
use crate::errors::{LifecycleError, TrackedError, TrackedKind};
use crate::model::ExecutableItem;
use crate::sink::ResultSink;

pub use outcome::{broken, classified, failed, passed, Failure};

impl<S: ResultSink> Lifecycle<S> {
    fn start_tracked(&self, kind: TrackedKind, name: &str) -> Result<Uuid, LifecycleError> {
        match kind {
            TrackedKind::Step => self.start_step(name),
            TrackedKind::BeforeFixture => self.start_before_fixture(name),
            TrackedKind::AfterFixture => self.start_after_fixture(name),
        }
    }

    fn stop_tracked(&self, kind: TrackedKind, uuid: Uuid, f: impl FnOnce(&mut ExecutableItem)) -> Result<(), LifecycleError> {
        match kind {
            TrackedKind::Step => self.stop_step_by(uuid, |s| f(&mut s.item)),
            TrackedKind::BeforeFixture | TrackedKind::AfterFixture => self.stop_fixture_by(uuid, |fx| f(&mut fx.item)),
        }
    }

    /// Cierra tras un fallo del body. El error del body tiene prioridad: un
    /// fallo al detener sólo se registra.
    fn stop_after_failure(&self, kind: TrackedKind, uuid: Uuid, name: &str, f: impl FnOnce(&mut ExecutableItem)) {
        if let Err(e) = self.stop_tracked(kind, uuid, f) {
            error!("could not stop {kind} '{name}' after failure: {e}");
        }
    }

    /// Ejecuta `body` como un step o fixture rastreado.
    ///
    /// `on_pass` se aplica si el body devuelve `Ok`; `on_fail` si devuelve
    /// `Err` o hace panic. Ver `outcome` para los helpers habituales.
    pub fn run_tracked<T, E, B, P, F>(&self,
                                      name: &str,
                                      kind: TrackedKind,
                                      body: B,
                                      on_pass: P,
                                      on_fail: F)
                                      -> Result<T, TrackedError<E>>
        where B: FnOnce() -> Result<T, E>,
              E: fmt::Display + fmt::Debug,
              P: FnOnce(&mut ExecutableItem),
              F: FnOnce(&mut ExecutableItem, &Failure)
    {
        let uuid = self.start_tracked(kind, name)?;
        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(value)) => {
                self.stop_tracked(kind, uuid, on_pass)?;
                Ok(value)
            }
            Ok(Err(source)) => {
                let failure = Failure::from_error(&source);
                self.stop_after_failure(kind, uuid, name, |item| on_fail(item, &failure));
                Err(TrackedError::Body { name: name.to_string(),
                                         kind,
                                         source })
            }
            Err(payload) => {
                let failure = Failure::from_panic(payload.as_ref());
                self.stop_after_failure(kind, uuid, name, |item| on_fail(item, &failure));
                panic::resume_unwind(payload)
            }
        }
    }

    /// Variante async de `run_tracked`. El contexto del flujo se conserva a
    /// través del `.await` del body siempre que el flujo corra dentro de un
    /// `context::scope` (o `spawn_flow`).
    pub async fn run_tracked_async<T, E, Fut, P, F>(&self,
                                                    name: &str,
                                                    kind: TrackedKind,
                                                    body: Fut,
                                                    on_pass: P,
                                                    on_fail: F)
                                                    -> Result<T, TrackedError<E>>
        where Fut: Future<Output = Result<T, E>>,
              E: fmt::Display + fmt::Debug,
              P: FnOnce(&mut ExecutableItem),
              F: FnOnce(&mut ExecutableItem, &Failure)
    {
        let uuid = self.start_tracked(kind, name)?;
        match AssertUnwindSafe(body).catch_unwind().await {
            Ok(Ok(value)) => {
                self.stop_tracked(kind, uuid, on_pass)?;
                Ok(value)
            }
            Ok(Err(source)) => {
                let failure = Failure::from_error(&source);
                self.stop_after_failure(kind, uuid, name, |item| on_fail(item, &failure));
                Err(TrackedError::Body { name: name.to_string(),
                                         kind,
                                         source })
            }
            Err(payload) => {
                let failure = Failure::from_panic(payload.as_ref());
                self.stop_after_failure(kind, uuid, name, |item| on_fail(item, &failure));
                panic::resume_unwind(payload)
            }
        }
    }

    /// Step con la semántica genérica: `Ok` = passed, cualquier error = failed.
    pub fn step<T, E>(&self, name: &str, body: impl FnOnce() -> Result<T, E>) -> Result<T, TrackedError<E>>
        where E: fmt::Display + fmt::Debug
    {
        self.run_tracked(name, TrackedKind::Step, body, passed(), failed())
    }

    /// Step infalible; sólo un panic lo marca como failed.
    pub fn step_fn<T>(&self, name: &str, body: impl FnOnce() -> T) -> Result<T, LifecycleError> {
        self.step(name, || Ok::<T, Infallible>(body())).map_err(|e| match e {
                                                           TrackedError::Lifecycle(e) => e,
                                                           TrackedError::Body { source, .. } => match source {},
                                                       })
    }

    pub async fn step_async<T, E, Fut>(&self, name: &str, body: Fut) -> Result<T, TrackedError<E>>
        where Fut: Future<Output = Result<T, E>>,
              E: fmt::Display + fmt::Debug
    {
        self.run_tracked_async(name, TrackedKind::Step, body, passed(), failed()).await
    }

    pub fn before_fixture<T, E>(&self, name: &str, body: impl FnOnce() -> Result<T, E>) -> Result<T, TrackedError<E>>
        where E: fmt::Display + fmt::Debug
    {
        self.run_tracked(name, TrackedKind::BeforeFixture, body, passed(), failed())
    }

    pub fn after_fixture<T, E>(&self, name: &str, body: impl FnOnce() -> Result<T, E>) -> Result<T, TrackedError<E>>
        where E: fmt::Display + fmt::Debug
    {
        self.run_tracked(name, TrackedKind::AfterFixture, body, passed(), failed())
    }
}
