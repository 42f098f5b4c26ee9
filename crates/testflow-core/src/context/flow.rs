//! Contexto de un flujo lógico y la máquina de estados de anidamiento.
//!
//! `FlowContext` sólo guarda identificadores de los items abiertos; los
//! registros viven en el `LiveArena` del engine. La fase del flujo se deriva
//! del contexto y la legalidad de cada transición sale de una tabla
//! constante (`LEGALITY`), no de condicionales dispersos.
use uuid::Uuid;

use crate::errors::LifecycleError;

/// Vista de "qué está activo" para un flujo. Se copia al hacer fork.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowContext {
    container: Option<Uuid>,
    fixture: Option<Uuid>,
    test: Option<Uuid>,
    steps: Vec<Uuid>,
}

/// Fase observable de un flujo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Container,
    Test,
    TestStep,
    /// Fixture activo (puede haber un test debajo).
    Fixture,
    FixtureStep,
}

impl Phase {
    pub const ALL: [Phase; 6] = [Phase::Idle,
                                 Phase::Container,
                                 Phase::Test,
                                 Phase::TestStep,
                                 Phase::Fixture,
                                 Phase::FixtureStep];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    StartContainer,
    StopContainer,
    StartTest,
    StopTest,
    StartFixture,
    StopFixture,
    StartStep,
    StopStep,
}

impl Transition {
    pub const ALL: [Transition; 8] = [Transition::StartContainer,
                                      Transition::StopContainer,
                                      Transition::StartTest,
                                      Transition::StopTest,
                                      Transition::StartFixture,
                                      Transition::StopFixture,
                                      Transition::StartStep,
                                      Transition::StopStep];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Legality {
    Allowed,
    IllegalState,
    NoActiveContext,
}

use Legality::{Allowed as A, IllegalState as IS, NoActiveContext as NAC};

/// Filas: `Transition` en orden de declaración. Columnas: `Phase` en orden
/// de declaración (Idle, Container, Test, TestStep, Fixture, FixtureStep).
pub const LEGALITY: [[Legality; 6]; 8] = [
    /* StartContainer */ [A, IS, IS, IS, IS, IS],
    /* StopContainer  */ [NAC, A, IS, IS, IS, IS],
    /* StartTest      */ [NAC, A, IS, IS, IS, IS],
    /* StopTest       */ [IS, IS, A, A, IS, IS],
    /* StartFixture   */ [NAC, A, A, A, IS, IS],
    /* StopFixture    */ [IS, IS, IS, IS, A, A],
    /* StartStep      */ [NAC, NAC, A, A, A, A],
    /* StopStep       */ [NAC, NAC, NAC, A, NAC, A],
];

pub fn legality(transition: Transition, phase: Phase) -> Legality { LEGALITY[transition as usize][phase as usize] }

impl FlowContext {
    pub fn new() -> Self { Self::default() }

    pub fn phase(&self) -> Phase {
        match (self.fixture, self.test, self.steps.is_empty()) {
            (Some(_), _, true) => Phase::Fixture,
            (Some(_), _, false) => Phase::FixtureStep,
            (None, Some(_), true) => Phase::Test,
            (None, Some(_), false) => Phase::TestStep,
            (None, None, _) if self.container.is_some() => Phase::Container,
            (None, None, _) => Phase::Idle,
        }
    }

    /// Valida `transition` contra la tabla de legalidad.
    pub fn check(&self, transition: Transition) -> Result<(), LifecycleError> {
        let phase = self.phase();
        match legality(transition, phase) {
            Legality::Allowed => Ok(()),
            Legality::IllegalState => Err(LifecycleError::illegal(format!("{transition:?} not allowed in phase {phase:?}"))),
            Legality::NoActiveContext => Err(LifecycleError::no_context(format!("{transition:?} requires an active parent (phase {phase:?})"))),
        }
    }

    pub fn container(&self) -> Option<Uuid> { self.container }
    pub fn fixture(&self) -> Option<Uuid> { self.fixture }
    pub fn test(&self) -> Option<Uuid> { self.test }
    pub fn steps(&self) -> &[Uuid] { &self.steps }
    pub fn current_step(&self) -> Option<Uuid> { self.steps.last().copied() }

    pub fn has_fixture(&self) -> bool { self.fixture.is_some() }
    pub fn has_step(&self) -> bool { !self.steps.is_empty() }

    pub fn activate_container(&mut self, uuid: Uuid) { self.container = Some(uuid); }
    pub fn deactivate_container(&mut self) -> Option<Uuid> { self.container.take() }

    pub fn activate_test(&mut self, uuid: Uuid) { self.test = Some(uuid); }
    pub fn deactivate_test(&mut self) -> Option<Uuid> { self.test.take() }

    /// Activa un fixture con pila de steps vacía. Devuelve los steps que
    /// estaban abiertos (quedan huérfanos; el engine decide qué hacer).
    pub fn activate_fixture(&mut self, uuid: Uuid) -> Vec<Uuid> {
        self.fixture = Some(uuid);
        std::mem::take(&mut self.steps)
    }

    pub fn deactivate_fixture(&mut self) -> Option<Uuid> {
        self.steps.clear();
        self.fixture.take()
    }

    pub fn push_step(&mut self, uuid: Uuid) { self.steps.push(uuid); }
    pub fn pop_step(&mut self) -> Option<Uuid> { self.steps.pop() }

    /// Vacía la pila de steps y devuelve su contenido (más externo primero).
    pub fn take_steps(&mut self) -> Vec<Uuid> { std::mem::take(&mut self.steps) }

    /// Recorta la pila dejando `len` elementos; devuelve los que estaban
    /// por encima.
    pub fn split_steps(&mut self, len: usize) -> Vec<Uuid> {
        if len >= self.steps.len() {
            return Vec::new();
        }
        self.steps.split_off(len)
    }

    /// Padre de un nuevo step: tope de la pila, si no el fixture, si no el test.
    pub fn current_step_parent(&self) -> Result<Uuid, LifecycleError> {
        self.current_executable()
            .ok_or_else(|| LifecycleError::no_context("no active test, fixture or step"))
    }

    /// Item ejecutable más interno (step ▸ fixture ▸ test).
    pub fn current_executable(&self) -> Option<Uuid> { self.current_step().or(self.fixture).or(self.test) }
}
