//! Python kernel process: bootstrap script and NDJSON request/reply glue.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    process::{Child, ChildStdin, ChildStdout},
    sync::Mutex,
};

use super::start_interpreter;
use crate::config::Config;
use crate::runtime::{Engine, EngineError, EngineLauncher, RunOutcome, ScriptFailure};

const KERNEL_SOURCE: &str = include_str!("kernel.py");

#[derive(Debug, Serialize)]
struct KernelRequest<'a> {
    id: u64,
    #[serde(flatten)]
    command: KernelCommand<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum KernelCommand<'a> {
    Reset,
    Exec { code: &'a str },
    Drain,
    Load { name: &'a str },
    Install { name: &'a str, manager: Option<&'a str> },
    Names,
}

#[derive(Debug, Deserialize)]
struct KernelReply {
    id: u64,
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    names: Option<Vec<String>>,
    #[serde(default)]
    error: Option<KernelFailure>,
}

#[derive(Debug, Deserialize)]
struct KernelFailure {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    traceback: Option<String>,
}

impl From<KernelFailure> for ScriptFailure {
    fn from(f: KernelFailure) -> Self {
        ScriptFailure { kind: f.kind, message: f.message, traceback: f.traceback }
    }
}

struct KernelIo {
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

/// A long-lived `python -c <kernel>` process holding one global namespace.
pub struct PythonEngine {
    io: Mutex<KernelIo>,
    child: Mutex<Option<Child>>,
    next_id: AtomicU64,
    version: String,
    package_manager: Option<String>,
}

impl PythonEngine {
    pub async fn spawn(program: &str, package_manager: Option<String>) -> Result<Self, EngineError> {
        let handle = start_interpreter(program, KERNEL_SOURCE)
            .map_err(|e| EngineError::Launch(format!("{:#}", e)))?;
        let mut lines = BufReader::new(handle.stdout).lines();

        let hello = read_reply(&mut lines).await?;
        if !hello.ready {
            return Err(EngineError::Protocol("kernel did not announce readiness".into()));
        }
        let version = hello.version.unwrap_or_else(|| "unknown".into());
        tracing::debug!(pid = ?handle.child.id(), %version, "python kernel started");

        Ok(Self {
            io: Mutex::new(KernelIo { stdin: handle.stdin, lines }),
            child: Mutex::new(Some(handle.child)),
            next_id: AtomicU64::new(0),
            version,
            package_manager,
        })
    }

    async fn call(&self, command: KernelCommand<'_>) -> Result<KernelReply, EngineError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut payload = serde_json::to_string(&KernelRequest { id, command })
            .map_err(|e| EngineError::Protocol(e.to_string()))?;
        payload.push('\n');

        let mut io = self.io.lock().await;
        io.stdin.write_all(payload.as_bytes()).await?;
        io.stdin.flush().await?;
        loop {
            let reply = read_reply(&mut io.lines).await?;
            if reply.id == id {
                return Ok(reply);
            }
            // left behind by a request whose caller gave up waiting
            tracing::debug!(expected = id, got = reply.id, "skipping stale kernel reply");
        }
    }

    async fn call_checked(&self, command: KernelCommand<'_>) -> Result<KernelReply, EngineError> {
        let mut reply = self.call(command).await?;
        match reply.error.take() {
            Some(failure) => Err(EngineError::Protocol(format!("{}: {}", failure.kind, failure.message))),
            None => Ok(reply),
        }
    }

    async fn provide(&self, name: &str, command: KernelCommand<'_>) -> Result<(), EngineError> {
        let reply = self.call(command).await?;
        match reply.error {
            Some(failure) => Err(EngineError::Package {
                name: name.to_string(),
                message: ScriptFailure::from(failure).display_message(),
            }),
            None => Ok(()),
        }
    }
}

async fn read_reply(lines: &mut Lines<BufReader<ChildStdout>>) -> Result<KernelReply, EngineError> {
    match lines.next_line().await? {
        Some(line) => serde_json::from_str(&line)
            .map_err(|e| EngineError::Protocol(format!("{}: {}", e, line))),
        None => Err(EngineError::Exited("kernel closed its output".into())),
    }
}

#[async_trait]
impl Engine for PythonEngine {
    fn describe(&self) -> String {
        format!("Python {}", self.version)
    }

    async fn load_package(&self, name: &str) -> Result<(), EngineError> {
        self.provide(name, KernelCommand::Load { name }).await
    }

    async fn install_package(&self, name: &str) -> Result<(), EngineError> {
        let manager = self.package_manager.as_deref();
        self.provide(name, KernelCommand::Install { name, manager }).await
    }

    async fn reset_output(&self) -> Result<(), EngineError> {
        self.call_checked(KernelCommand::Reset).await.map(|_| ())
    }

    async fn run(&self, source: &str) -> Result<RunOutcome, EngineError> {
        let reply = self.call(KernelCommand::Exec { code: source }).await?;
        Ok(match reply.error {
            Some(failure) => RunOutcome::Raised(failure.into()),
            None => RunOutcome::Completed,
        })
    }

    async fn drain_output(&self) -> Result<String, EngineError> {
        let reply = self.call_checked(KernelCommand::Drain).await?;
        Ok(reply.output.unwrap_or_default())
    }

    async fn global_names(&self) -> Result<Vec<String>, EngineError> {
        let reply = self.call_checked(KernelCommand::Names).await?;
        Ok(reply.names.unwrap_or_default())
    }

    async fn terminate(&self) {
        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };
        if let Err(e) = child.start_kill() {
            tracing::debug!(error = %e, "kernel already gone");
        }
        let _ = child.wait().await;
    }
}

/// Launches [`PythonEngine`]s from a configured interpreter path.
#[derive(Debug, Clone)]
pub struct PythonLauncher {
    program: String,
    package_manager: Option<String>,
}

impl PythonLauncher {
    pub fn new(program: impl Into<String>, package_manager: Option<String>) -> Self {
        Self { program: program.into(), package_manager }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.python_path(), cfg.get_list("PACKAGE_MANAGER").into_iter().next())
    }
}

#[async_trait]
impl EngineLauncher for PythonLauncher {
    async fn launch(&self) -> Result<Arc<dyn Engine>, EngineError> {
        let engine = PythonEngine::spawn(&self.program, self.package_manager.clone()).await?;
        Ok(Arc::new(engine))
    }
}
