//! pycourse: an interactive Python course backed by a persistent, session-scoped sandbox.

pub mod config;
pub mod course;
pub mod execution;
pub mod handlers;
pub mod llm;
pub mod printer;
pub mod process;
pub mod role;
pub mod runtime;
pub mod tui;
pub mod tutor;
pub mod utils;
