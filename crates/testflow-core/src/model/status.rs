use serde::{Deserialize, Serialize};

/// Resultado observable de un item ejecutable.
///
/// `Unknown` es el estado inicial; `Passed`, `Failed`, `Broken` y `Skipped`
/// son terminales una vez que el item se detiene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Unknown,
    Passed,
    /// Fallo reportado explícitamente (aserciones).
    Failed,
    /// Error inesperado durante la ejecución.
    Broken,
    Skipped,
}

impl Status {
    pub fn is_failure(self) -> bool { matches!(self, Status::Failed | Status::Broken) }
}

/// Etapa de vida de un item: `Running` mientras está activo, `Finished` tras
/// el `stop`. Las transiciones válidas son sólo `Running` -> `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Running,
    Finished,
}

/// Detalles asociados a un estado (normalmente a un fallo).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(default)]
    pub known: bool,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub flaky: bool,
}

impl StatusDetails {
    pub fn message(msg: impl Into<String>) -> Self {
        Self { message: Some(msg.into()),
               ..Self::default() }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }
}
