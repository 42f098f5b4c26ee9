//! Vocabulario de metadatos de un test: etiquetas, links y parámetros.
//! Son datos planos sin comportamiento.
use serde::{Deserialize, Serialize};

/// Par nombre/valor. El nombre no es único dentro de un test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(),
               value: value.into() }
    }

    pub fn severity(value: impl Into<String>) -> Self { Self::new("severity", value) }
    pub fn owner(value: impl Into<String>) -> Self { Self::new("owner", value) }
    pub fn tag(value: impl Into<String>) -> Self { Self::new("tag", value) }
    pub fn suite(value: impl Into<String>) -> Self { Self::new("suite", value) }
    pub fn feature(value: impl Into<String>) -> Self { Self::new("feature", value) }
    pub fn story(value: impl Into<String>) -> Self { Self::new("story", value) }
    pub fn epic(value: impl Into<String>) -> Self { Self::new("epic", value) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub url: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Link {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self { name: name.into(),
               url: url.into(),
               kind: None }
    }

    pub fn issue(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self { kind: Some("issue".into()),
               ..Self::new(name, url) }
    }

    pub fn tms(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self { kind: Some("tms".into()),
               ..Self::new(name, url) }
    }
}

/// Parámetro con el que se ejecutó un test o step. Entra en el
/// `history_id` del test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub excluded: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(),
               value: value.into(),
               excluded: false }
    }
}
