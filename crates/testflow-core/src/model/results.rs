//! Registros de resultados: test, fixture, step y container.
//!
//! `ExecutableItem` es la forma común de todo lo que se ejecuta (nombre,
//! estado, tiempos, attachments y sub-steps). Se embebe con
//! `#[serde(flatten)]` en cada registro concreto, de modo que el JSON
//! persistido queda plano.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Attachment, Label, Link, Parameter, Stage, Status, StatusDetails};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableItem {
    pub name: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    pub stage: Stage,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds_option", default)]
    pub stop: Option<DateTime<Utc>>,
    #[serde(default)]
    pub steps: Vec<StepResult>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
}

impl ExecutableItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               status: Status::Unknown,
               status_details: None,
               stage: Stage::Running,
               start: Utc::now(),
               stop: None,
               steps: Vec::new(),
               attachments: Vec::new(),
               parameters: Vec::new(),
               description: None,
               description_html: None }
    }

    /// Marca el item como terminado. El estado queda como lo dejó el
    /// mutador del `stop`.
    pub(crate) fn finalize(&mut self) {
        self.stage = Stage::Finished;
        self.stop = Some(Utc::now());
    }

    pub fn set_status(&mut self, status: Status) { self.status = status; }

    pub fn fail_with(&mut self, status: Status, details: StatusDetails) {
        self.status = status;
        self.status_details = Some(details);
    }

    pub fn is_finished(&self) -> bool { self.stage == Stage::Finished }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub uuid: Uuid,
    #[serde(flatten)]
    pub item: ExecutableItem,
}

impl StepResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self { uuid: Uuid::new_v4(),
               item: ExecutableItem::new(name) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureKind {
    Before,
    After,
}

/// Fixture de setup (`Before`) o teardown (`After`). Pertenece a un único
/// container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureResult {
    pub uuid: Uuid,
    pub container: Uuid,
    pub kind: FixtureKind,
    #[serde(flatten)]
    pub item: ExecutableItem,
}

impl FixtureResult {
    pub fn new(container: Uuid, kind: FixtureKind, name: impl Into<String>) -> Self {
        Self { uuid: Uuid::new_v4(),
               container,
               kind,
               item: ExecutableItem::new(name) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub uuid: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub item: ExecutableItem,
}

impl TestResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self { uuid: Uuid::new_v4(),
               history_id: None,
               full_name: None,
               labels: Vec::new(),
               links: Vec::new(),
               item: ExecutableItem::new(name) }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.item.parameters.push(parameter);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.item.description = Some(description.into());
        self
    }

    /// Añade una etiqueta; se permiten nombres duplicados.
    pub fn add_label(&mut self, label: Label) { self.labels.push(label); }

    /// Reemplaza todas las etiquetas con ese nombre por un único valor.
    pub fn set_label(&mut self, name: &str, value: impl Into<String>) {
        self.labels.retain(|l| l.name != name);
        self.labels.push(Label::new(name, value));
    }

    pub fn label_values(&self, name: &str) -> Vec<&str> {
        self.labels.iter().filter(|l| l.name == name).map(|l| l.value.as_str()).collect()
    }
}

/// Agrupación externa (clase/suite) donde corren fixtures y tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerResult {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default)]
    pub children: Vec<Uuid>,
    #[serde(default)]
    pub befores: Vec<Uuid>,
    #[serde(default)]
    pub afters: Vec<Uuid>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds_option", default)]
    pub stop: Option<DateTime<Utc>>,
}

impl ContainerResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self { uuid: Uuid::new_v4(),
               name: name.into(),
               children: Vec::new(),
               befores: Vec::new(),
               afters: Vec::new(),
               start: Utc::now(),
               stop: None }
    }
}
