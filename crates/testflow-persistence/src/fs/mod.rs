//! `ResultSink` sobre el sistema de archivos.
//!
//! Layout del directorio de resultados:
//! - `<uuid>-result.json`: un test terminado.
//! - `<uuid>-fixture.json`: un fixture terminado.
//! - `<uuid>-container.json`: un container terminado.
//! - `<uuid>-attachment<ext>`: bytes de un attachment, bajo su clave.
//!
//! Cada archivo se escribe con un nombre temporal y se renombra, así un
//! lector nunca observa un archivo a medio escribir.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use testflow_core::constants::{CONTAINER_RESULT_SUFFIX, FIXTURE_RESULT_SUFFIX, TEST_RESULT_SUFFIX};
use testflow_core::{ContainerResult, FixtureResult, PersistedResult, ResultSink, SinkError, TestResult};
use uuid::Uuid;

use crate::config::ResultsConfig;
use crate::error::PersistenceError;

const TEMP_PREFIX: &str = ".tmp-";

#[derive(Debug, Clone)]
pub struct FileSystemResultSink {
    config: ResultsConfig,
}

impl FileSystemResultSink {
    /// Crea el sink y el directorio de resultados si no existe.
    pub fn new(config: ResultsConfig) -> Result<Self, PersistenceError> {
        fs::create_dir_all(&config.results_dir).map_err(|e| PersistenceError::io(&config.results_dir, e))?;
        debug!("file system sink ready dir={} pretty={}", config.results_dir.display(), config.pretty);
        Ok(Self { config })
    }

    pub fn from_env() -> Result<Self, PersistenceError> { Self::new(ResultsConfig::from_env()) }

    pub fn dir(&self) -> &Path { &self.config.results_dir }

    pub fn config(&self) -> &ResultsConfig { &self.config }

    /// Ruta final de `key`. Las claves son nombres de archivo planos.
    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let invalid = key.is_empty()
                      || key.starts_with('.')
                      || key.contains(['/', '\\'])
                      || key.contains("..");
        if invalid {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.config.results_dir.join(key))
    }

    /// Escribe `bytes` en un temporal y lo renombra a `target`.
    fn write_atomic(&self, target: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
        let tmp = self.config.results_dir.join(format!("{TEMP_PREFIX}{}", Uuid::new_v4()));
        let written = fs::File::create(&tmp).and_then(|mut f| {
                                                  f.write_all(bytes)?;
                                                  f.sync_all()
                                              });
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(PersistenceError::io(&tmp, e));
        }
        fs::rename(&tmp, target).map_err(|e| {
                                    let _ = fs::remove_file(&tmp);
                                    PersistenceError::io(target, e)
                                })
    }

    fn write_key(&self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        let target = self.path_for(key)?;
        if target.exists() {
            return Err(PersistenceError::AlreadyExists(key.to_string()));
        }
        self.write_atomic(&target, bytes)
    }

    fn to_json<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, PersistenceError> {
        let bytes = if self.config.pretty { serde_json::to_vec_pretty(value)? } else { serde_json::to_vec(value)? };
        Ok(bytes)
    }

    fn persist_json<T: Serialize>(&self, uuid: Uuid, suffix: &str, value: &T) -> Result<(), PersistenceError> {
        let bytes = self.to_json(value)?;
        let target = self.path_for(&format!("{uuid}{suffix}"))?;
        with_retry(|| self.write_atomic(&target, &bytes))?;
        debug!("persisted {}", target.display());
        Ok(())
    }

    /// Lee todos los registros con `suffix` del directorio.
    fn read_all<T: DeserializeOwned>(&self, suffix: &str) -> Result<Vec<T>, PersistenceError> {
        let dir = &self.config.results_dir;
        let mut out = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| PersistenceError::io(dir, e))? {
            let path = entry.map_err(|e| PersistenceError::io(dir, e))?.path();
            let is_match = path.file_name()
                               .and_then(|n| n.to_str())
                               .is_some_and(|n| n.ends_with(suffix) && !n.starts_with(TEMP_PREFIX));
            if !is_match {
                continue;
            }
            let bytes = fs::read(&path).map_err(|e| PersistenceError::io(&path, e))?;
            out.push(serde_json::from_slice(&bytes)?);
        }
        Ok(out)
    }

    pub fn read_tests(&self) -> Result<Vec<TestResult>, PersistenceError> { self.read_all(TEST_RESULT_SUFFIX) }

    pub fn read_fixtures(&self) -> Result<Vec<FixtureResult>, PersistenceError> { self.read_all(FIXTURE_RESULT_SUFFIX) }

    pub fn read_containers(&self) -> Result<Vec<ContainerResult>, PersistenceError> { self.read_all(CONTAINER_RESULT_SUFFIX) }

    pub fn read_attachment(&self, key: &str) -> Result<Vec<u8>, PersistenceError> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|e| PersistenceError::io(&path, e))
    }
}

impl ResultSink for FileSystemResultSink {
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), SinkError> {
        with_retry(|| self.write_key(key, bytes))?;
        debug!("attachment written key={key} bytes={}", bytes.len());
        Ok(())
    }

    fn persist(&self, item: PersistedResult) -> Result<(), SinkError> {
        match &item {
            PersistedResult::Test(t) => self.persist_json(t.uuid, TEST_RESULT_SUFFIX, t)?,
            PersistedResult::Fixture(f) => self.persist_json(f.uuid, FIXTURE_RESULT_SUFFIX, f)?,
            PersistedResult::Container(c) => self.persist_json(c.uuid, CONTAINER_RESULT_SUFFIX, c)?,
        }
        Ok(())
    }
}

fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if e.is_retryable() && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms",
                      attempts + 1,
                      e,
                      delay_ms);
                std::thread::sleep(Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}
