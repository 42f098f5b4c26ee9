//! Attachments binarios.
//!
//! El core sólo registra la referencia (`source`); los bytes se entregan al
//! `ResultSink` bajo esa misma clave. Las claves se generan con un uuid v4,
//! así escrituras concurrentes nunca colisionan y no hace falta ningún lock.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::ATTACHMENT_SUFFIX;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    pub source: String,
}

/// Genera una clave `<uuid>-attachment<ext>`. Se antepone `.` a la
/// extensión si falta; una extensión vacía se respeta.
pub fn attachment_source(extension: &str) -> String {
    let ext = extension.trim();
    if ext.is_empty() || ext.starts_with('.') {
        format!("{}{}{}", Uuid::new_v4(), ATTACHMENT_SUFFIX, ext)
    } else {
        format!("{}{}.{}", Uuid::new_v4(), ATTACHMENT_SUFFIX, ext)
    }
}
