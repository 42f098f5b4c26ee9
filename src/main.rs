//! Demo: corre dos suites pequeñas instrumentadas con testflow, una síncrona
//! en paralelo con rayon y otra async sobre tokio, y escribe los resultados
//! en `TESTFLOW_RESULTS_DIR`.

use std::collections::BTreeMap;
use std::time::Duration;

use rayon::prelude::*;
use testflow::config::CONFIG;
use testflow::context::{self, FlowContext};
use testflow::testflow_core::{LifecycleError, Parameter, Status, TestResult};
use testflow::testflow_persistence::FileSystemResultSink;
use testflow::errors::FacadeError;
use testflow::GlobalLifecycle;
use thiserror::Error;

#[derive(Debug, Error)]
enum DemoError {
    #[error("expected {expected}, got {actual}")]
    Mismatch { expected: i64, actual: i64 },
    #[error("timeout after {0}ms")]
    Timeout(u64),
    #[error("setup failed: {0}")]
    Setup(String),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

const TIMEOUT_MS: u64 = 20;

struct Case {
    a: i64,
    b: i64,
    expected: i64,
}

fn run_case(lc: &GlobalLifecycle, case: &Case) -> Result<(), LifecycleError> {
    let test = TestResult::new(format!("{} + {} = {}", case.a, case.b, case.expected))
        .with_full_name("arithmetic::add")
        .with_parameter(Parameter::new("a", case.a.to_string()))
        .with_parameter(Parameter::new("b", case.b.to_string()));
    lc.start_test_case(test)?;
    testflow::feature("arithmetic")?;
    testflow::severity("normal")?;

    let result = testflow::step("compute", || Ok::<_, DemoError>(case.a + case.b)).and_then(|sum| {
                     testflow::step("verify", || {
                         if sum == case.expected {
                             Ok(())
                         } else {
                             Err(DemoError::Mismatch { expected: case.expected,
                                                       actual: sum })
                         }
                     })
                 });
    let status = match &result {
        Ok(()) => Status::Passed,
        Err(e) => {
            testflow::text_attachment("failure", &e.to_string())?;
            Status::Failed
        }
    };
    lc.stop_test_case(|t| t.item.status = status)
}

fn run_sync_suite(lc: &'static GlobalLifecycle) -> Result<(), DemoError> {
    lc.start_container("arithmetic")?;
    let cases = lc.before_fixture("load cases", || {
                      Ok::<_, DemoError>(vec![Case { a: 1, b: 1, expected: 2 },
                                              Case { a: 2, b: 3, expected: 5 },
                                              Case { a: -4, b: 4, expected: 0 },
                                              Case { a: 7, b: 6, expected: 12 }])
                  })
                  .map_err(|e| DemoError::Setup(e.to_string()))?;

    let parent = context::fork();
    let results: Vec<Result<(), LifecycleError>> =
        cases.par_iter().map(|case| context::scope_sync(parent.clone(), || run_case(lc, case))).collect();
    for r in results {
        r?;
    }
    lc.stop_container()?;
    Ok(())
}

async fn request(lc: &'static GlobalLifecycle, id: u64, latency_ms: u64) -> Result<(), LifecycleError> {
    lc.start_test_case(TestResult::new(format!("request #{id}")).with_full_name("io::request"))?;
    testflow::parameter("latency_ms", latency_ms)?;
    let outcome = testflow::step_async("send", async {
                      let sent = tokio::time::timeout(Duration::from_millis(TIMEOUT_MS), tokio::time::sleep(Duration::from_millis(latency_ms))).await;
                      if sent.is_err() {
                          return Err(DemoError::Timeout(TIMEOUT_MS).to_string());
                      }
                      testflow::step_async("decode", async { Ok::<_, DemoError>(id) }).await
                                                                                     .map_err(|e| e.to_string())
                  })
                  .await;
    let status = if outcome.is_ok() { Status::Passed } else { Status::Broken };
    lc.stop_test_case(|t| t.item.status = status)
}

async fn run_async_suite(lc: &'static GlobalLifecycle) -> Result<(), LifecycleError> {
    lc.start_container("io")?;
    let handles: Vec<_> = [(1, 2), (2, 5), (3, 40), (4, 1)].into_iter()
                                                            .map(|(id, latency)| context::spawn_flow(request(lc, id, latency)))
                                                            .collect();
    for h in handles {
        match h.await {
            Ok(r) => r?,
            Err(e) => log::error!("request task failed: {e}"),
        }
    }
    lc.stop_container()
}

fn summary() -> Result<BTreeMap<String, usize>, FacadeError> {
    let sink = FileSystemResultSink::new(CONFIG.results.clone())?;
    let mut counts = BTreeMap::new();
    for t in sink.read_tests()? {
        *counts.entry(format!("{:?}", t.item.status).to_lowercase()).or_insert(0) += 1;
    }
    Ok(counts)
}

fn main() {
    // Cargar variables de entorno desde .env si existe (antes de leer CONFIG)
    testflow::testflow_persistence::init_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let lc = match testflow::install_from_env() {
        Ok(lc) => lc,
        Err(e) => {
            eprintln!("[testflow] no se pudo instalar el lifecycle: {e}");
            std::process::exit(1);
        }
    };
    println!("[testflow] resultados en {}", CONFIG.results.results_dir.display());

    if let Err(e) = run_sync_suite(lc) {
        eprintln!("[testflow] suite síncrona: {e}");
    }

    let rt = match tokio::runtime::Builder::new_multi_thread().worker_threads(2).enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("[testflow] no se pudo crear el runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(context::scope(FlowContext::new(), run_async_suite(lc))) {
        eprintln!("[testflow] suite async: {e}");
    }

    match summary() {
        Ok(counts) => println!("[testflow] resumen: {}", serde_json::to_string(&counts).unwrap_or_default()),
        Err(e) => eprintln!("[testflow] no se pudo leer el resumen: {e}"),
    }
}
