//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) y expone una estructura inmutable (`CONFIG`).
use once_cell::sync::Lazy;
use testflow_persistence::ResultsConfig;

/// Configuración global de la aplicación.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Dónde y cómo escribe resultados el sink por defecto.
    pub results: ResultsConfig,
}

/// Instancia global perezosa de configuración, evaluada una sola vez.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| AppConfig { results: ResultsConfig::from_env() });
