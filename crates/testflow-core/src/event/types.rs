//! Eventos del lifecycle.
//!
//! Cada transición del engine emite un `LifecycleEvent` hacia los listeners
//! registrados. Los eventos son informativos: no participan en el estado
//! del engine ni en lo que se persiste.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{FixtureKind, Status};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LifecycleEventKind {
    ContainerStarted { uuid: Uuid, name: String },
    ContainerStopped { uuid: Uuid },
    TestStarted { uuid: Uuid, name: String },
    TestStopped { uuid: Uuid, status: Status },
    FixtureStarted { uuid: Uuid, kind: FixtureKind, name: String },
    FixtureStopped { uuid: Uuid, status: Status },
    /// `parent` es el test, fixture o step que recibe al nuevo step.
    StepStarted { uuid: Uuid, parent: Uuid, name: String },
    StepStopped { uuid: Uuid, status: Status },
    AttachmentAdded { source: String, name: String },
}

impl LifecycleEventKind {
    /// Código compacto, útil para comparar secuencias en tests.
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleEventKind::ContainerStarted { .. } => "C+",
            LifecycleEventKind::ContainerStopped { .. } => "C-",
            LifecycleEventKind::TestStarted { .. } => "T+",
            LifecycleEventKind::TestStopped { .. } => "T-",
            LifecycleEventKind::FixtureStarted { .. } => "F+",
            LifecycleEventKind::FixtureStopped { .. } => "F-",
            LifecycleEventKind::StepStarted { .. } => "S+",
            LifecycleEventKind::StepStopped { .. } => "S-",
            LifecycleEventKind::AttachmentAdded { .. } => "A",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Test activo en el flujo que emitió el evento, si lo hay.
    pub test: Option<Uuid>,
    pub kind: LifecycleEventKind,
    pub ts: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn new(test: Option<Uuid>, kind: LifecycleEventKind) -> Self {
        Self { test,
               kind,
               ts: Utc::now() }
    }
}
