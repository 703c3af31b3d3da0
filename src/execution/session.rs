//! Session controller: one run at a time against the shared interpreter.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::Result;
use tokio::sync::Mutex;

use super::{ExecutionRequest, ExecutionResult};
use crate::config::Config;
use crate::process::python::PythonLauncher;
use crate::runtime::{
    BootstrapError, BootstrapPlan, EngineError, RunOutcome, RuntimeHandle, RuntimeManager, RuntimeStatus,
};

#[derive(Debug, Clone)]
pub struct ExecutionPolicy {
    /// Wall-clock limit per run; `None` disables the watchdog.
    pub timeout: Option<Duration>,
    /// Keep stdout produced before an exception instead of discarding it.
    pub preserve_partial_output: bool,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self { timeout: Some(Duration::from_secs(30)), preserve_partial_output: true }
    }
}

impl ExecutionPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            timeout: cfg.get_duration("EXECUTION_TIMEOUT"),
            preserve_partial_output: cfg.get_bool("PRESERVE_PARTIAL_OUTPUT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxStatus {
    Uninitialized,
    Loading,
    Ready,
    Running,
    /// Ready, with at least one run behind it.
    Idle,
    Failed(String),
}

impl fmt::Display for SandboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("not started"),
            Self::Loading => f.write_str("loading interpreter"),
            Self::Ready => f.write_str("ready"),
            Self::Running => f.write_str("running"),
            Self::Idle => f.write_str("idle"),
            Self::Failed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

enum Interrupt {
    Engine(EngineError),
    TimedOut(Duration),
}

struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn new(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SessionController {
    runtime: RuntimeManager,
    policy: ExecutionPolicy,
    turn: Mutex<()>,
    running: AtomicBool,
    completed: AtomicU64,
}

impl SessionController {
    pub fn new(runtime: RuntimeManager, policy: ExecutionPolicy) -> Self {
        Self {
            runtime,
            policy,
            turn: Mutex::new(()),
            running: AtomicBool::new(false),
            completed: AtomicU64::new(0),
        }
    }

    /// Controller backed by a Python kernel process as configured.
    pub fn from_config(cfg: &Config) -> Self {
        let launcher = Arc::new(PythonLauncher::from_config(cfg));
        let runtime = RuntimeManager::new(launcher, BootstrapPlan::from_config(cfg));
        Self::new(runtime, ExecutionPolicy::from_config(cfg))
    }

    pub fn runtime(&self) -> &RuntimeManager {
        &self.runtime
    }

    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    pub fn status(&self) -> SandboxStatus {
        if self.running.load(Ordering::SeqCst) {
            return SandboxStatus::Running;
        }
        match self.runtime.status() {
            RuntimeStatus::Uninitialized => SandboxStatus::Uninitialized,
            RuntimeStatus::Loading => SandboxStatus::Loading,
            RuntimeStatus::Ready if self.completed.load(Ordering::SeqCst) > 0 => SandboxStatus::Idle,
            RuntimeStatus::Ready => SandboxStatus::Ready,
            RuntimeStatus::Failed(msg) => SandboxStatus::Failed(msg),
        }
    }

    /// Run source text and report what it printed and whether it raised.
    ///
    /// Concurrent callers queue on the controller and run in arrival order.
    /// Never fails: bootstrap errors, engine crashes and timeouts all come back
    /// as the result's `error`.
    pub async fn execute(&self, request: impl Into<ExecutionRequest>) -> ExecutionResult {
        let request = request.into();
        let _turn = self.turn.lock().await;

        let handle = match self.runtime.acquire().await {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(error = %err, "execution rejected: interpreter unavailable");
                return ExecutionResult::failure(String::new(), bootstrap_message(&err));
            }
        };

        let _running = RunningGuard::new(&self.running);
        let started = Instant::now();
        let attempt = self.run_on(&handle, request.source());
        let settled = match self.policy.timeout {
            Some(limit) => match tokio::time::timeout(limit, attempt).await {
                Ok(result) => result.map_err(Interrupt::Engine),
                Err(_) => Err(Interrupt::TimedOut(limit)),
            },
            None => attempt.await.map_err(Interrupt::Engine),
        };
        self.completed.fetch_add(1, Ordering::SeqCst);

        match settled {
            Ok(result) => {
                tracing::debug!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    raised = !result.is_success(),
                    "execution settled"
                );
                result
            }
            Err(Interrupt::TimedOut(limit)) => {
                tracing::warn!(limit_s = limit.as_secs(), "execution timed out; restarting interpreter");
                self.runtime.reset().await;
                ExecutionResult::failure(
                    String::new(),
                    format!(
                        "Execution timed out after {}s. The interpreter was restarted and earlier definitions were cleared.",
                        limit.as_secs()
                    ),
                )
            }
            Err(Interrupt::Engine(err)) => {
                tracing::error!(error = %err, "interpreter failed during execution");
                self.runtime.reset().await;
                ExecutionResult::failure(
                    String::new(),
                    format!("The interpreter stopped unexpectedly ({}). It will be restarted on the next run.", err),
                )
            }
        }
    }

    /// User-defined names in the shared namespace.
    pub async fn namespace(&self) -> Result<Vec<String>> {
        let _turn = self.turn.lock().await;
        let handle = self.runtime.acquire().await?;
        Ok(handle.engine().global_names().await?)
    }

    /// Manual retry after a failed bootstrap.
    pub async fn retry(&self) -> Result<RuntimeHandle, BootstrapError> {
        self.runtime.retry().await
    }

    async fn run_on(&self, handle: &RuntimeHandle, source: &str) -> Result<ExecutionResult, EngineError> {
        let engine = handle.engine();
        engine.reset_output().await?;
        let outcome = engine.run(source).await?;
        let output = engine.drain_output().await?;
        Ok(match outcome {
            RunOutcome::Completed => ExecutionResult::success(output),
            RunOutcome::Raised(failure) => {
                let output = if self.policy.preserve_partial_output { output } else { String::new() };
                ExecutionResult::failure(output, failure.display_message())
            }
        })
    }
}

fn bootstrap_message(err: &BootstrapError) -> String {
    format!("The Python sandbox is unavailable: {}. Retry once the problem is fixed.", err)
}
