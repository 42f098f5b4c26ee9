//! Constantes del motor de lifecycle.
//!
//! Los sufijos de nombre de archivo forman parte del formato en disco que
//! consume el renderer de reportes externo. Cambiarlos rompe la
//! compatibilidad con resultados ya escritos.

/// Sufijo intermedio de las claves de attachment: `<uuid>-attachment<ext>`.
pub const ATTACHMENT_SUFFIX: &str = "-attachment";

/// Sufijo del archivo de un `TestResult` persistido.
pub const TEST_RESULT_SUFFIX: &str = "-result.json";

/// Sufijo del archivo de un `FixtureResult` persistido.
pub const FIXTURE_RESULT_SUFFIX: &str = "-fixture.json";

/// Sufijo del archivo de un `ContainerResult` persistido.
pub const CONTAINER_RESULT_SUFFIX: &str = "-container.json";

/// Mensaje usado al cerrar steps que quedaron abiertos bajo su padre.
pub const UNSTOPPED_STEP_MESSAGE: &str = "step was not stopped before its parent";
