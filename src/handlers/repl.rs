//! REPL handler with TUI interface using Ratatui.

use std::io;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use is_terminal::IsTerminal;

use crate::config::Config;
use crate::course::Course;
use crate::execution::SessionController;
use crate::tui::run_tui_repl;
use crate::tutor::ChatAssistant;

pub async fn run(controller: Arc<SessionController>, cfg: &Config, course: &Course) -> Result<()> {
    if !io::stdout().is_terminal() {
        eprintln!("Warning: TUI mode not available in this environment. REPL requires a proper terminal.");
        return Err(anyhow!("TUI mode requires a proper terminal environment"));
    }

    let assistant = match ChatAssistant::from_config(cfg, course) {
        Ok(assistant) => Some(assistant),
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "course assistant unavailable");
            None
        }
    };
    run_tui_repl(controller, assistant).await
}
