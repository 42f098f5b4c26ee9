//! Core `Lifecycle` implementation

use chrono::Utc;
use log::{debug, error, warn};
use uuid::Uuid;

use super::arena::{LiveArena, LiveItem};
use crate::constants::UNSTOPPED_STEP_MESSAGE;
use crate::context::{with_flow, Transition};
use crate::errors::LifecycleError;
use crate::event::{CompositeListener, LifecycleEvent, LifecycleEventKind, LifecycleListener};
use crate::hashing::history_id;
use crate::model::{attachment_source, Attachment, ContainerResult, ExecutableItem, FixtureKind, FixtureResult, Stage, Status,
                   StatusDetails, StepResult, TestResult};
use crate::sink::{PersistedResult, ResultSink};

/// Motor del lifecycle de tests.
///
/// Mantiene los items vivos en una arena compartida y delega en el
/// `FlowContext` del flujo actual (ver `context::with_flow`) la pregunta
/// "qué está activo". Cada `start*` valida la transición contra la tabla de
/// legalidad, cada `update*` edita en sitio el registro vivo y cada `stop*`
/// finaliza el registro y lo entrega al `ResultSink` (o a su padre, en el
/// caso de los steps).
pub struct Lifecycle<S: ResultSink> {
    sink: S,
    arena: LiveArena,
    listeners: CompositeListener,
}

impl<S: ResultSink> std::fmt::Debug for Lifecycle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle").finish_non_exhaustive()
    }
}

impl<S: ResultSink> Lifecycle<S> {
    /// Crea un nuevo engine sin listeners
    pub fn new(sink: S) -> Self {
        Self { sink,
               arena: LiveArena::default(),
               listeners: CompositeListener::new() }
    }

    /// Crea un nuevo builder para configurar el engine
    #[inline]
    pub fn builder(sink: S) -> super::LifecycleBuilder<S> { super::LifecycleBuilder::new(sink) }

    pub(crate) fn with_listeners(sink: S, listeners: CompositeListener) -> Self {
        Self { sink,
               arena: LiveArena::default(),
               listeners }
    }

    /// Añade un listener
    pub fn add_listener(&mut self, listener: Box<dyn LifecycleListener>) { self.listeners.push(listener); }

    pub fn sink(&self) -> &S { &self.sink }

    /// Cantidad de items iniciados y aún no detenidos (todos los flujos).
    pub fn live_items(&self) -> usize { self.arena.len() }

    pub fn is_running(&self, uuid: Uuid) -> bool { self.arena.contains(uuid) }

    pub fn current_container(&self) -> Option<Uuid> { with_flow(|ctx| ctx.container()) }
    pub fn current_test_case(&self) -> Option<Uuid> { with_flow(|ctx| ctx.test()) }
    pub fn current_fixture(&self) -> Option<Uuid> { with_flow(|ctx| ctx.fixture()) }
    pub fn current_step(&self) -> Option<Uuid> { with_flow(|ctx| ctx.current_step()) }

    fn emit(&self, kind: LifecycleEventKind) {
        if self.listeners.is_empty() {
            return;
        }
        let test = match &kind {
            LifecycleEventKind::TestStarted { uuid, .. } | LifecycleEventKind::TestStopped { uuid, .. } => Some(*uuid),
            _ => with_flow(|ctx| ctx.test()),
        };
        self.listeners.notify(&LifecycleEvent::new(test, kind));
    }

    fn persist(&self, item: PersistedResult) {
        let uuid = item.uuid();
        if let Err(e) = self.sink.persist(item) {
            error!("result sink failed to persist {uuid}: {e}");
        }
    }

    // ---------------- Container ----------------

    pub fn start_container(&self, name: impl Into<String>) -> Result<Uuid, LifecycleError> {
        let container = ContainerResult::new(name);
        let uuid = container.uuid;
        let name = container.name.clone();
        with_flow(|ctx| -> Result<(), LifecycleError> {
            ctx.check(Transition::StartContainer)?;
            self.arena.insert(uuid, LiveItem::Container(container))?;
            ctx.activate_container(uuid);
            Ok(())
        })?;
        debug!("container started uuid={uuid} name={name}");
        self.emit(LifecycleEventKind::ContainerStarted { uuid, name });
        Ok(uuid)
    }

    /// Edita el container activo del flujo.
    ///
    /// `f` corre con el item bloqueado: llamar al lifecycle desde dentro de `f`
    /// falla con `IllegalState`.
    pub fn update_container(&self, f: impl FnOnce(&mut ContainerResult)) -> Result<(), LifecycleError> {
        let uuid = with_flow(|ctx| ctx.container()).ok_or_else(|| LifecycleError::no_context("no active container"))?;
        self.arena.with_container(uuid, f)
    }

    pub fn stop_container(&self) -> Result<(), LifecycleError> {
        self.arena.ensure_not_reentrant()?;
        let uuid = with_flow(|ctx| -> Result<Uuid, LifecycleError> {
            ctx.check(Transition::StopContainer)?;
            ctx.deactivate_container()
               .ok_or_else(|| LifecycleError::no_context("no active container"))
        })?;
        let mut container = self.arena.take_container(uuid)?;
        container.stop = Some(Utc::now());
        debug!("container stopped uuid={uuid} children={}", container.children.len());
        self.persist(PersistedResult::Container(container));
        self.emit(LifecycleEventKind::ContainerStopped { uuid });
        Ok(())
    }

    // ---------------- Test case ----------------

    /// Inicia un test dentro del container activo y lo activa en el flujo.
    ///
    /// Devuelve el uuid del test para que el adapter pueda correlacionarlo.
    /// Si `history_id` no viene fijado se calcula a partir del nombre
    /// completo (o el nombre) y los parámetros.
    pub fn start_test_case(&self, mut test: TestResult) -> Result<Uuid, LifecycleError> {
        let uuid = test.uuid;
        let name = test.item.name.clone();
        with_flow(|ctx| -> Result<(), LifecycleError> {
            ctx.check(Transition::StartTest)?;
            let container = ctx.container()
                               .ok_or_else(|| LifecycleError::no_context("test case requires an active container"))?;
            if test.history_id.is_none() {
                let full_name = test.full_name.as_deref().unwrap_or(&test.item.name);
                test.history_id = Some(history_id(full_name, &test.item.parameters));
            }
            test.item.start = Utc::now();
            test.item.stage = Stage::Running;
            self.arena.with_container(container, |c| c.children.push(uuid))?;
            self.arena.insert(uuid, LiveItem::Test(test))?;
            ctx.activate_test(uuid);
            Ok(())
        })?;
        debug!("test started uuid={uuid} name={name}");
        self.emit(LifecycleEventKind::TestStarted { uuid, name });
        Ok(uuid)
    }

    /// Edita el test activo del flujo.
    ///
    /// `f` corre con el item bloqueado: llamar al lifecycle desde dentro de `f`
    /// falla con `IllegalState`.
    pub fn update_test_case(&self, f: impl FnOnce(&mut TestResult)) -> Result<(), LifecycleError> {
        let uuid = with_flow(|ctx| ctx.test()).ok_or_else(|| LifecycleError::no_context("no active test case"))?;
        self.arena.with_test(uuid, f)
    }

    /// Aplica `f`, finaliza el test, lo persiste y lo desactiva.
    ///
    /// El test deja de estar activo en el flujo aunque otro flujo ya lo haya
    /// detenido; en ese caso devuelve `ItemNotRunning`.
    pub fn stop_test_case(&self, f: impl FnOnce(&mut TestResult)) -> Result<(), LifecycleError> {
        self.arena.ensure_not_reentrant()?;
        let (uuid, dangling) = with_flow(|ctx| -> Result<(Uuid, Vec<Uuid>), LifecycleError> {
            ctx.check(Transition::StopTest)?;
            let uuid = ctx.deactivate_test().ok_or_else(|| LifecycleError::illegal("no active test case"))?;
            Ok((uuid, ctx.take_steps()))
        })?;
        self.close_dangling(dangling);
        let mut test = self.arena.take_test(uuid)?;
        f(&mut test);
        test.item.finalize();
        let status = test.item.status;
        debug!("test stopped uuid={uuid} status={status:?}");
        self.persist(PersistedResult::Test(test));
        self.emit(LifecycleEventKind::TestStopped { uuid, status });
        Ok(())
    }

    // ---------------- Fixtures ----------------

    pub fn start_before_fixture(&self, name: impl Into<String>) -> Result<Uuid, LifecycleError> {
        self.start_fixture(FixtureKind::Before, name.into())
    }

    pub fn start_after_fixture(&self, name: impl Into<String>) -> Result<Uuid, LifecycleError> {
        self.start_fixture(FixtureKind::After, name.into())
    }

    fn start_fixture(&self, kind: FixtureKind, name: String) -> Result<Uuid, LifecycleError> {
        let (uuid, dangling) = with_flow(|ctx| -> Result<(Uuid, Vec<Uuid>), LifecycleError> {
            ctx.check(Transition::StartFixture)?;
            let container = ctx.container()
                               .ok_or_else(|| LifecycleError::no_context("fixture requires an active container"))?;
            let fixture = FixtureResult::new(container, kind, name.clone());
            let uuid = fixture.uuid;
            self.arena.with_container(container, |c| match kind {
                          FixtureKind::Before => c.befores.push(uuid),
                          FixtureKind::After => c.afters.push(uuid),
                      })?;
            self.arena.insert(uuid, LiveItem::Fixture(fixture))?;
            Ok((uuid, ctx.activate_fixture(uuid)))
        })?;
        self.close_dangling(dangling);
        debug!("fixture started uuid={uuid} kind={kind:?} name={name}");
        self.emit(LifecycleEventKind::FixtureStarted { uuid, kind, name });
        Ok(uuid)
    }

    /// Edita el fixture activo del flujo.
    ///
    /// `f` corre con el item bloqueado: llamar al lifecycle desde dentro de `f`
    /// falla con `IllegalState`.
    pub fn update_fixture(&self, f: impl FnOnce(&mut FixtureResult)) -> Result<(), LifecycleError> {
        let uuid = with_flow(|ctx| ctx.fixture()).ok_or_else(|| LifecycleError::no_context("no active fixture"))?;
        self.arena.with_fixture(uuid, f)
    }

    /// Aplica `f`, finaliza el fixture activo, lo persiste y lo desactiva.
    pub fn stop_fixture(&self, f: impl FnOnce(&mut FixtureResult)) -> Result<(), LifecycleError> {
        let uuid = with_flow(|ctx| ctx.fixture()).ok_or_else(|| LifecycleError::illegal("no active fixture"))?;
        self.stop_fixture_by(uuid, f)
    }

    /// Como `stop_fixture`, pero exige que el fixture activo sea `uuid`.
    pub fn stop_fixture_by(&self, uuid: Uuid, f: impl FnOnce(&mut FixtureResult)) -> Result<(), LifecycleError> {
        self.arena.ensure_not_reentrant()?;
        let dangling = with_flow(|ctx| -> Result<Vec<Uuid>, LifecycleError> {
            ctx.check(Transition::StopFixture)?;
            if ctx.fixture() != Some(uuid) {
                return Err(LifecycleError::illegal(format!("fixture {uuid} is not the active fixture")));
            }
            let steps = ctx.take_steps();
            ctx.deactivate_fixture();
            Ok(steps)
        })?;
        self.close_dangling(dangling);
        let mut fixture = self.arena.take_fixture(uuid)?;
        f(&mut fixture);
        fixture.item.finalize();
        let status = fixture.item.status;
        debug!("fixture stopped uuid={uuid} status={status:?}");
        self.persist(PersistedResult::Fixture(fixture));
        self.emit(LifecycleEventKind::FixtureStopped { uuid, status });
        Ok(())
    }

    // ---------------- Steps ----------------

    /// Inicia un step como hijo del step, fixture o test más interno.
    pub fn start_step(&self, name: impl Into<String>) -> Result<Uuid, LifecycleError> {
        let step = StepResult::new(name);
        let uuid = step.uuid;
        let name = step.item.name.clone();
        let parent = with_flow(|ctx| -> Result<Uuid, LifecycleError> {
            ctx.check(Transition::StartStep)?;
            let parent = ctx.current_step_parent()?;
            self.arena.insert(uuid, LiveItem::Step { parent, step })?;
            ctx.push_step(uuid);
            Ok(parent)
        })?;
        debug!("step started uuid={uuid} parent={parent} name={name}");
        self.emit(LifecycleEventKind::StepStarted { uuid, parent, name });
        Ok(uuid)
    }

    /// Edita el step más interno del flujo.
    ///
    /// `f` corre con el item bloqueado: llamar al lifecycle desde dentro de `f`
    /// falla con `IllegalState`.
    pub fn update_step(&self, f: impl FnOnce(&mut StepResult)) -> Result<(), LifecycleError> {
        let uuid = with_flow(|ctx| ctx.current_step()).ok_or_else(|| LifecycleError::no_context("no active step"))?;
        self.arena.with_step(uuid, f)
    }

    /// Detiene el step más interno: aplica `f`, lo finaliza y lo agrega a los
    /// `steps` de su padre.
    pub fn stop_step(&self, f: impl FnOnce(&mut StepResult)) -> Result<(), LifecycleError> {
        self.arena.ensure_not_reentrant()?;
        let uuid = with_flow(|ctx| -> Result<Uuid, LifecycleError> {
            ctx.check(Transition::StopStep)?;
            ctx.pop_step().ok_or_else(|| LifecycleError::no_context("no active step"))
        })?;
        self.finish_step(uuid, f)
    }

    /// Detiene el step `uuid`. Los steps abiertos por encima de él se cierran
    /// antes como `Broken`.
    pub fn stop_step_by(&self, uuid: Uuid, f: impl FnOnce(&mut StepResult)) -> Result<(), LifecycleError> {
        self.arena.ensure_not_reentrant()?;
        let above = with_flow(|ctx| -> Result<Vec<Uuid>, LifecycleError> {
            ctx.check(Transition::StopStep)?;
            let pos = ctx.steps()
                         .iter()
                         .rposition(|s| *s == uuid)
                         .ok_or(LifecycleError::ItemNotRunning(uuid))?;
            let above = ctx.split_steps(pos + 1);
            ctx.pop_step();
            Ok(above)
        })?;
        self.close_dangling(above);
        self.finish_step(uuid, f)
    }

    fn finish_step(&self, uuid: Uuid, f: impl FnOnce(&mut StepResult)) -> Result<(), LifecycleError> {
        let (parent, mut step) = self.arena.take_step(uuid)?;
        f(&mut step);
        step.item.finalize();
        let status = step.item.status;
        self.arena.with_executable(parent, |p| p.steps.push(step))?;
        debug!("step stopped uuid={uuid} status={status:?}");
        self.emit(LifecycleEventKind::StepStopped { uuid, status });
        Ok(())
    }

    /// Cierra como `Broken` steps que siguen abiertos cuando su padre se
    /// detiene o cuando un fixture nuevo toma el flujo. `steps` va del más
    /// externo al más interno.
    fn close_dangling(&self, steps: Vec<Uuid>) {
        for uuid in steps.into_iter().rev() {
            warn!("closing step {uuid} left open by its caller");
            let res = self.finish_step(uuid, |s| {
                              if s.item.status == Status::Unknown {
                                  s.item.fail_with(Status::Broken, StatusDetails::message(UNSTOPPED_STEP_MESSAGE));
                              }
                          });
            if let Err(e) = res {
                error!("could not close dangling step {uuid}: {e}");
            }
        }
    }

    // ---------------- Generic updates ----------------

    /// Edita el item ejecutable más interno del flujo (step ▸ fixture ▸ test).
    ///
    /// `f` corre con el item bloqueado: llamar al lifecycle desde dentro de `f`
    /// falla con `IllegalState`.
    pub fn update_executable_item(&self, f: impl FnOnce(&mut ExecutableItem)) -> Result<(), LifecycleError> {
        let uuid = with_flow(|ctx| ctx.current_executable())
            .ok_or_else(|| LifecycleError::no_context("no active test, fixture or step"))?;
        self.arena.with_executable(uuid, f)
    }

    /// Edita un item vivo por uuid, sea del flujo que sea. Falla con
    /// `ItemNotRunning` si el item ya se detuvo.
    ///
    /// `f` corre con el item bloqueado: llamar al lifecycle desde dentro de `f`
    /// falla con `IllegalState`.
    pub fn update_item(&self, uuid: Uuid, f: impl FnOnce(&mut ExecutableItem)) -> Result<(), LifecycleError> {
        self.arena.with_executable(uuid, f)
    }

    // ---------------- Attachments ----------------

    /// Registra un attachment en el item más interno y escribe sus bytes en
    /// el sink. Devuelve la clave `source` generada.
    pub fn add_attachment(&self,
                          name: impl Into<String>,
                          mime: Option<&str>,
                          extension: &str,
                          bytes: &[u8])
                          -> Result<String, LifecycleError> {
        let source = self.prepare_attachment(name, mime, extension)?;
        self.write_attachment(&source, bytes);
        Ok(source)
    }

    /// Registra el attachment sin escribir bytes todavía. El contenido se
    /// entrega después con `write_attachment`.
    pub fn prepare_attachment(&self, name: impl Into<String>, mime: Option<&str>, extension: &str) -> Result<String, LifecycleError> {
        let name = name.into();
        let source = attachment_source(extension);
        let target = with_flow(|ctx| ctx.current_executable())
            .ok_or_else(|| LifecycleError::no_context("attachment requires an active test, fixture or step"))?;
        let attachment = Attachment { name: name.clone(),
                                      mime: mime.map(str::to_string),
                                      source: source.clone() };
        self.arena.with_executable(target, |item| item.attachments.push(attachment))?;
        self.emit(LifecycleEventKind::AttachmentAdded { source: source.clone(),
                                                        name });
        Ok(source)
    }

    pub fn write_attachment(&self, source: &str, bytes: &[u8]) {
        if let Err(e) = self.sink.write(source, bytes) {
            error!("result sink failed to write attachment {source}: {e}");
        }
    }
}
