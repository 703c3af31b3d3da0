//! Execution engine: protocol and result types.

use serde::{Deserialize, Serialize};

pub mod session;

pub use session::{ExecutionPolicy, SandboxStatus, SessionController};

/// Source text to run. Carries no state of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    source: String,
}

impl ExecutionRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl From<&str> for ExecutionRequest {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for ExecutionRequest {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

/// Outcome of one execution: captured stdout, plus the failure message if the script raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self { output: output.into(), error: None }
    }

    pub fn failure(output: impl Into<String>, error: impl Into<String>) -> Self {
        Self { output: output.into(), error: Some(error.into()) }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
