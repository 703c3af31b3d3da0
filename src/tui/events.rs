//! Custom event types for the TUI application.

use crossterm::event::KeyEvent;

use crate::execution::ExecutionResult;

#[derive(Debug)]
pub enum TuiEvent {
    Key(KeyEvent),
    /// Bracketed paste content
    Paste(String),
    /// A submitted line or block, before dispatch
    Submit(String),
    ExecutionFinished(ExecutionResult),
    AssistantReply(String),
    Variables(Result<Vec<String>, String>),
    RetryFinished(Result<String, String>),
    /// Dispatch the next queued submission
    ProcessNext,
}
