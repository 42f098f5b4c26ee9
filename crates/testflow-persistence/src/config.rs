//! Carga de configuración del directorio de resultados desde variables de
//! entorno. Convención: `TESTFLOW_RESULTS_DIR` y `TESTFLOW_PRETTY_JSON`.

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

pub const RESULTS_DIR_VAR: &str = "TESTFLOW_RESULTS_DIR";
pub const PRETTY_JSON_VAR: &str = "TESTFLOW_PRETTY_JSON";
pub const DEFAULT_RESULTS_DIR: &str = "testflow-results";

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsConfig {
    pub results_dir: PathBuf,
    /// JSON indentado en lugar de compacto.
    pub pretty: bool,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self { results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
               pretty: false }
    }
}

impl ResultsConfig {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self { results_dir: results_dir.into(),
               ..Self::default() }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn from_env() -> Self {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero leyendo de `lookup`; valores vacíos cuentan
    /// como ausentes.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let results_dir = get(RESULTS_DIR_VAR).map(PathBuf::from)
                                              .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR));
        let pretty = get(PRETTY_JSON_VAR).map(|v| parse_flag(&v)).unwrap_or(false);
        Self { results_dir, pretty }
    }
}

fn parse_flag(value: &str) -> bool { matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on") }

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() { Lazy::force(&DOTENV_LOADED); }
