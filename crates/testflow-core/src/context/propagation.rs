//! Propagación del `FlowContext` por flujo lógico.
//!
//! Dos ranuras:
//! - `TASK_FLOW` (`tokio::task_local!`): sigue la identidad de la tarea, no
//!   la del hilo worker, así que sobrevive a cada `.await` aunque el
//!   scheduler mueva la tarea de hilo.
//! - `THREAD_FLOW` (`thread_local!`): para flujos síncronos (un hilo del
//!   runner, rayon, `std::thread`).
//!
//! - `UNSCOPED_TASKS`: tareas tokio lanzadas sin `scope`/`spawn_flow`. Cada
//!   una recibe su propio contexto, indexado por `tokio::task::Id`, en vez
//!   de compartir el del hilo worker con otras tareas.
//!
//! Orden de resolución: `scope` async, `scope_sync`, tarea sin scope, hilo.
//! Los forks copian el contexto del padre; las escrituras posteriores no son
//! visibles ni para el padre ni para los hermanos.
use std::cell::{Cell, RefCell};
use std::future::Future;

use dashmap::DashMap;
use log::debug;
use once_cell::sync::Lazy;
use tokio::task::{Id as TaskId, JoinHandle};

use super::FlowContext;

tokio::task_local! {
    static TASK_FLOW: RefCell<FlowContext>;
}

thread_local! {
    static THREAD_FLOW: RefCell<FlowContext> = RefCell::new(FlowContext::default());
    static SYNC_SCOPE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Contextos de tareas tokio que no corren dentro de un `scope`. La entrada
/// se borra cuando el contexto vuelve a estar vacío.
static UNSCOPED_TASKS: Lazy<DashMap<TaskId, FlowContext>> = Lazy::new(DashMap::new);

fn in_task_scope() -> bool { TASK_FLOW.try_with(|_| ()).is_ok() }

fn in_sync_scope() -> bool { SYNC_SCOPE_DEPTH.with(Cell::get) > 0 }

fn with_unscoped_task<R>(id: TaskId, f: impl FnOnce(&mut FlowContext) -> R) -> R {
    let (out, empty) = {
        let mut entry = UNSCOPED_TASKS.entry(id).or_insert_with(|| {
                                                    debug!("task {id} has no flow scope, keying its context by task id");
                                                    FlowContext::default()
                                                });
        let out = f(entry.value_mut());
        (out, *entry.value() == FlowContext::default())
    };
    if empty {
        UNSCOPED_TASKS.remove_if(&id, |_, ctx| *ctx == FlowContext::default());
    }
    out
}

/// Ejecuta `f` con acceso mutable al contexto del flujo actual.
///
/// `f` no debe volver a llamar a `with_flow` (el contexto ya está prestado).
pub fn with_flow<R>(f: impl FnOnce(&mut FlowContext) -> R) -> R {
    if in_task_scope() {
        TASK_FLOW.with(|cell| f(&mut cell.borrow_mut()))
    } else if in_sync_scope() {
        THREAD_FLOW.with(|cell| f(&mut cell.borrow_mut()))
    } else if let Some(id) = tokio::task::try_id() {
        with_unscoped_task(id, f)
    } else {
        THREAD_FLOW.with(|cell| f(&mut cell.borrow_mut()))
    }
}

/// Copia del contexto actual.
pub fn snapshot() -> FlowContext { with_flow(|ctx| ctx.clone()) }

/// Copia del contexto actual para entregar a un sub-flujo (copy-on-fork).
pub fn fork() -> FlowContext { snapshot() }

/// Limpia el contexto del flujo actual.
pub fn reset() { with_flow(|ctx| *ctx = FlowContext::default()); }

/// Ejecuta `fut` como un flujo propio que arranca con `ctx`.
pub async fn scope<F: Future>(ctx: FlowContext, fut: F) -> F::Output { TASK_FLOW.scope(RefCell::new(ctx), fut).await }

/// Lanza una tarea tokio con una copia del contexto actual.
pub fn spawn_flow<F>(fut: F) -> JoinHandle<F::Output>
    where F: Future + Send + 'static,
          F::Output: Send + 'static
{
    let ctx = fork();
    tokio::spawn(scope(ctx, fut))
}

/// Restaura el contexto previo del hilo al salir, incluso si `f` hace panic.
struct ThreadFlowGuard {
    previous: Option<FlowContext>,
}

impl Drop for ThreadFlowGuard {
    fn drop(&mut self) {
        if let Some(prev) = self.previous.take() {
            THREAD_FLOW.with(|cell| *cell.borrow_mut() = prev);
        }
        SYNC_SCOPE_DEPTH.with(|d| d.set(d.get() - 1));
    }
}

/// Ejecuta `f` en el hilo actual con `ctx` como contexto síncrono.
///
/// Dentro de una tarea sin `scope` (p.ej. `spawn_blocking`) también manda
/// `ctx`. Dentro de un `scope` async manda el contexto de la tarea.
pub fn scope_sync<R>(ctx: FlowContext, f: impl FnOnce() -> R) -> R {
    let previous = THREAD_FLOW.with(|cell| cell.replace(ctx));
    SYNC_SCOPE_DEPTH.with(|d| d.set(d.get() + 1));
    let _guard = ThreadFlowGuard { previous: Some(previous) };
    f()
}

/// Lanza un hilo del sistema con una copia del contexto actual.
pub fn spawn_thread_flow<F, T>(f: F) -> std::thread::JoinHandle<T>
    where F: FnOnce() -> T + Send + 'static,
          T: Send + 'static
{
    let ctx = fork();
    std::thread::spawn(move || scope_sync(ctx, f))
}
