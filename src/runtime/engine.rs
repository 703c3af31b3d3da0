//! Engine seam: what the runtime manager and session controller need from an interpreter.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Failures of the engine itself (not of the user's script).
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("failed to launch interpreter: {0}")]
    Launch(String),
    #[error("interpreter I/O failed: {0}")]
    Io(String),
    #[error("malformed interpreter reply: {0}")]
    Protocol(String),
    #[error("interpreter exited: {0}")]
    Exited(String),
    #[error("package '{name}' unavailable: {message}")]
    Package { name: String, message: String },
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

/// An exception raised by user code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFailure {
    /// Exception type name, e.g. `ZeroDivisionError`.
    pub kind: String,
    pub message: String,
    pub traceback: Option<String>,
}

impl ScriptFailure {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: kind.into(), message: message.into(), traceback: None }
    }

    /// Message shown to the learner: the exception text, or its type when the text is empty.
    pub fn display_message(&self) -> String {
        if self.message.trim().is_empty() {
            self.kind.clone()
        } else {
            self.message.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Raised(ScriptFailure),
}

/// A live interpreter with one global namespace and one capturable stdout channel.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Interpreter name and version, for status displays.
    fn describe(&self) -> String;

    /// Import a prebuilt package (or the package-management helper).
    async fn load_package(&self, name: &str) -> Result<(), EngineError>;

    /// Make a package importable, installing it through the package manager if needed.
    async fn install_package(&self, name: &str) -> Result<(), EngineError>;

    /// Point stdout at a fresh, empty in-memory buffer.
    async fn reset_output(&self) -> Result<(), EngineError>;

    /// Run source text against the shared namespace.
    async fn run(&self, source: &str) -> Result<RunOutcome, EngineError>;

    /// Take everything written to the buffer since the last reset.
    async fn drain_output(&self) -> Result<String, EngineError>;

    /// User-defined global names currently bound in the namespace.
    async fn global_names(&self) -> Result<Vec<String>, EngineError>;

    /// Stop the interpreter. Idempotent.
    async fn terminate(&self);
}

/// Starts engines. The only place an interpreter is launched.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn Engine>, EngineError>;
}
