//! Ratatui sandbox REPL.

pub mod app;
pub mod events;
pub mod handler;
pub mod ui;

pub use app::ReplCommand;
pub use handler::run_tui_repl;
