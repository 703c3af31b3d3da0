//! Against a real interpreter. Skipped when `python3` is not on PATH.

use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use pycourse::execution::{ExecutionPolicy, SessionController};
use pycourse::process::python::PythonLauncher;
use pycourse::runtime::{BootstrapPlan, Engine, EngineError, EngineLauncher, RunOutcome, RuntimeManager};

fn python_available() -> bool {
    let found = Command::new("python3")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    if !found {
        println!("python3 not found, skipping");
    }
    found
}

async fn engine() -> Result<Arc<dyn Engine>> {
    Ok(PythonLauncher::new("python3", Some("pip".into())).launch().await?)
}

async fn run(engine: &Arc<dyn Engine>, code: &str) -> Result<(RunOutcome, String)> {
    engine.reset_output().await?;
    let outcome = engine.run(code).await?;
    Ok((outcome, engine.drain_output().await?))
}

#[tokio::test]
async fn kernel_captures_stdout_and_keeps_globals() -> Result<()> {
    if !python_available() {
        return Ok(());
    }
    let engine = engine().await?;
    assert!(engine.describe().starts_with("Python 3"));

    let (outcome, output) = run(&engine, "floor_count = 45\nprint(floor_count * 3.5)").await?;
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(output, "157.5\n");

    let (_, output) = run(&engine, "print(f'{floor_count} floors')").await?;
    assert_eq!(output, "45 floors\n");

    let names = engine.global_names().await?;
    assert!(names.contains(&"floor_count".to_string()));
    engine.terminate().await;
    Ok(())
}

#[tokio::test]
async fn kernel_reports_exceptions() -> Result<()> {
    if !python_available() {
        return Ok(());
    }
    let engine = engine().await?;

    let (outcome, output) = run(&engine, "print('start')\nint('Five')").await?;
    assert_eq!(output, "start\n");
    let RunOutcome::Raised(failure) = outcome else {
        panic!("expected an exception");
    };
    assert_eq!(failure.kind, "ValueError");
    assert!(failure.message.contains("Five"));
    assert!(failure.traceback.unwrap_or_default().contains("Traceback"));

    // no stdin inside the sandbox
    let (outcome, _) = run(&engine, "input('name? ')").await?;
    assert!(matches!(outcome, RunOutcome::Raised(f) if f.kind == "EOFError"));

    // SystemExit is a script failure, not an interpreter exit
    let (outcome, _) = run(&engine, "raise SystemExit(3)").await?;
    assert!(matches!(outcome, RunOutcome::Raised(f) if f.kind == "SystemExit"));
    let (_, output) = run(&engine, "print('still here')").await?;
    assert_eq!(output, "still here\n");
    engine.terminate().await;
    Ok(())
}

#[tokio::test]
async fn raw_fd_writes_do_not_corrupt_the_protocol() -> Result<()> {
    if !python_available() {
        return Ok(());
    }
    let engine = engine().await?;
    let (outcome, _) = run(&engine, "import os\nos.write(1, b'noise\\n')").await?;
    assert_eq!(outcome, RunOutcome::Completed);
    let (_, output) = run(&engine, "print('clean')").await?;
    assert_eq!(output, "clean\n");
    engine.terminate().await;
    Ok(())
}

#[tokio::test]
async fn missing_packages_are_reported() -> Result<()> {
    if !python_available() {
        return Ok(());
    }
    let engine = engine().await?;
    engine.load_package("json").await?;
    let err = engine.load_package("no_such_module_for_pycourse").await.unwrap_err();
    assert!(matches!(err, EngineError::Package { ref name, .. } if name == "no_such_module_for_pycourse"));
    engine.terminate().await;
    Ok(())
}

#[tokio::test]
async fn watchdog_restarts_a_real_interpreter() -> Result<()> {
    if !python_available() {
        return Ok(());
    }
    let runtime = RuntimeManager::new(
        Arc::new(PythonLauncher::new("python3", None)),
        BootstrapPlan { timeout: Some(Duration::from_secs(30)), ..BootstrapPlan::default() },
    );
    let policy = ExecutionPolicy { timeout: Some(Duration::from_secs(1)), preserve_partial_output: true };
    let session = SessionController::new(runtime, policy);

    session.execute("total_cost = 1000").await;
    let stuck = session.execute("while True:\n    pass").await;
    assert!(stuck.error.unwrap_or_default().contains("timed out"));

    let after = session.execute("print(total_cost)").await;
    assert!(after.error.unwrap_or_default().contains("total_cost"));
    assert_eq!(session.execute("print('ok')").await.output, "ok\n");
    session.runtime().shutdown().await;
    Ok(())
}

fn session() -> SessionController {
    let runtime = RuntimeManager::new(Arc::new(PythonLauncher::new("python3", None)), BootstrapPlan::default());
    SessionController::new(runtime, ExecutionPolicy::default())
}

#[tokio::test]
async fn lone_surrogates_do_not_break_the_session() -> Result<()> {
    if !python_available() {
        return Ok(());
    }
    let session = session();
    session.execute("kept = 7").await;

    let result = session.execute("print('\\ud800')").await;
    assert_eq!(result.error, None);
    assert_eq!(result.output, "\\ud800\n");

    let err = session.execute("raise ValueError('bad \\udcff')").await;
    assert_eq!(err.error.as_deref(), Some("bad \\udcff"));

    assert_eq!(session.execute("print(kept)").await.output, "7\n");
    session.runtime().shutdown().await;
    Ok(())
}

#[tokio::test]
async fn exceptions_with_broken_str_are_script_errors() -> Result<()> {
    if !python_available() {
        return Ok(());
    }
    let session = session();
    session.execute("kept = 7").await;

    let code = "class BrokenWall(Exception):\n    def __str__(self):\n        raise RuntimeError('no text')\nraise BrokenWall()";
    let result = session.execute(code).await;
    assert_eq!(result.error.as_deref(), Some("BrokenWall"));

    assert_eq!(session.execute("print(kept)").await.output, "7\n");
    session.runtime().shutdown().await;
    Ok(())
}
