//! Async event handler for the sandbox REPL.

use std::io;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossterm::event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use tokio::sync::{mpsc, Mutex};

use super::{
    app::{App, EntryKind, InputMode, ReplCommand},
    events::TuiEvent,
    ui::render_ui,
};
use crate::execution::SessionController;
use crate::printer::render_segments;
use crate::tutor::{parse_segments, ChatAssistant};

struct Services {
    controller: Arc<SessionController>,
    assistant: Option<Arc<Mutex<ChatAssistant>>>,
    tx: mpsc::UnboundedSender<TuiEvent>,
}

/// Run the TUI-based sandbox REPL until the user quits.
pub async fn run_tui_repl(controller: Arc<SessionController>, assistant: Option<ChatAssistant>) -> Result<()> {
    if !io::IsTerminal::is_terminal(&io::stdout()) {
        return Err(anyhow!("TUI mode requires a proper terminal environment"));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(assistant.is_some());
    app.push_entry(
        EntryKind::Info,
        "Python sandbox. Definitions persist between runs. Type :help for commands.",
    );

    let (tx, rx) = mpsc::unbounded_channel::<TuiEvent>();
    let services = Services { controller, assistant: assistant.map(|a| Arc::new(Mutex::new(a))), tx };

    // warm the interpreter up while the user types
    let warm = Arc::clone(&services.controller);
    tokio::spawn(async move {
        if let Err(e) = warm.runtime().acquire().await {
            tracing::debug!(error = %e, "interpreter warm-up failed");
        }
    });

    let result = run_app(&mut terminal, &mut app, &services, rx).await;

    disable_raw_mode()?;
    terminal.backend_mut().execute(DisableBracketedPaste)?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    services: &Services,
    mut rx: mpsc::UnboundedReceiver<TuiEvent>,
) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let input_tx = services.tx.clone();
    let input_stop = Arc::clone(&stop);
    tokio::task::spawn_blocking(move || {
        while !input_stop.load(Ordering::Relaxed) {
            if !event::poll(Duration::from_millis(100)).unwrap_or(false) {
                continue;
            }
            let forwarded = match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => input_tx.send(TuiEvent::Key(key)),
                Ok(Event::Paste(text)) => input_tx.send(TuiEvent::Paste(text)),
                _ => Ok(()),
            };
            if forwarded.is_err() {
                break;
            }
        }
    });

    let outcome = loop {
        app.status = services.controller.status();
        terminal.draw(|frame| render_ui(frame, app))?;

        let event = match tokio::time::timeout(Duration::from_millis(50), rx.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => break Ok(()),
            // redraw so the status bar follows the sandbox
            Err(_) => continue,
        };
        match handle_event(app, services, event) {
            Ok(true) => break Ok(()),
            Ok(false) => {}
            Err(e) => break Err(e),
        }
    };
    stop.store(true, Ordering::Relaxed);
    outcome
}

/// Returns true when the user asked to quit.
fn handle_event(app: &mut App, services: &Services, event: TuiEvent) -> Result<bool> {
    match event {
        TuiEvent::Key(key) => return Ok(handle_key_event(app, services, key)),
        TuiEvent::Paste(text) => app.insert_str(&text),
        TuiEvent::Submit(text) => {
            if !app.try_queue(text.clone()) {
                return Ok(dispatch(app, services, &text));
            }
        }
        TuiEvent::ProcessNext => {
            if let Some(next) = app.dequeue() {
                return Ok(dispatch(app, services, &next));
            }
        }
        TuiEvent::ExecutionFinished(result) => {
            app.record_result(&result);
            settle(app, services);
        }
        TuiEvent::AssistantReply(reply) => {
            app.push_entry(EntryKind::Answer, render_segments(&parse_segments(&reply), false));
            settle(app, services);
        }
        TuiEvent::Variables(Ok(names)) => {
            app.show_variables(names);
            settle(app, services);
        }
        TuiEvent::Variables(Err(e)) => {
            app.push_entry(EntryKind::Error, e);
            settle(app, services);
        }
        TuiEvent::RetryFinished(Ok(engine)) => {
            app.push_entry(EntryKind::Info, format!("Sandbox ready ({}).", engine));
            settle(app, services);
        }
        TuiEvent::RetryFinished(Err(e)) => {
            app.push_entry(EntryKind::Error, e);
            settle(app, services);
        }
    }
    Ok(false)
}

fn settle(app: &mut App, services: &Services) {
    app.busy = false;
    let _ = services.tx.send(TuiEvent::ProcessNext);
}

/// Start whatever the submission asks for. Returns true on quit.
fn dispatch(app: &mut App, services: &Services, submission: &str) -> bool {
    let Some(command) = ReplCommand::parse(submission) else {
        return false;
    };
    let tx = services.tx.clone();
    match command {
        ReplCommand::Run(code) => {
            app.push_entry(EntryKind::Code, code.clone());
            app.busy = true;
            let controller = Arc::clone(&services.controller);
            tokio::spawn(async move {
                let result = controller.execute(code).await;
                let _ = tx.send(TuiEvent::ExecutionFinished(result));
            });
        }
        ReplCommand::Ask(question) => {
            let Some(assistant) = services.assistant.clone() else {
                app.push_entry(EntryKind::Info, "The course assistant is not available in this session.");
                return false;
            };
            app.push_entry(EntryKind::Question, question.clone());
            app.busy = true;
            tokio::spawn(async move {
                let reply = assistant.lock().await.send(&question).await;
                let _ = tx.send(TuiEvent::AssistantReply(reply));
            });
        }
        ReplCommand::Variables => {
            app.busy = true;
            let controller = Arc::clone(&services.controller);
            tokio::spawn(async move {
                let names = controller.namespace().await.map_err(|e| format!("{:#}", e));
                let _ = tx.send(TuiEvent::Variables(names));
            });
        }
        ReplCommand::Retry => {
            app.push_entry(EntryKind::Info, "Restarting the Python sandbox...");
            app.busy = true;
            let controller = Arc::clone(&services.controller);
            tokio::spawn(async move {
                let outcome = controller
                    .retry()
                    .await
                    .map(|handle| handle.engine().describe())
                    .map_err(|e| e.to_string());
                let _ = tx.send(TuiEvent::RetryFinished(outcome));
            });
        }
        ReplCommand::Help => app.toggle_help(),
        ReplCommand::Clear => app.entries.clear(),
        ReplCommand::Quit => return true,
        ReplCommand::Unknown(cmd) => {
            app.push_entry(EntryKind::Info, format!("Unknown command ':{}'. Type :help for commands.", cmd));
        }
    }
    false
}

fn handle_key_event(app: &mut App, services: &Services, key: KeyEvent) -> bool {
    if app.is_popup_shown() {
        app.hide_popup();
        return false;
    }
    if app.show_help && key.code == KeyCode::Esc {
        app.toggle_help();
        return false;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => return app.handle_ctrl_c(),
        KeyCode::Char('d') if ctrl && app.input.is_empty() => return true,
        KeyCode::Char('h') if ctrl => app.toggle_help(),
        KeyCode::F(1) => app.toggle_help(),
        KeyCode::PageUp => app.scroll_up(),
        KeyCode::PageDown => app.scroll_down(),
        KeyCode::Up => app.history_prev(),
        KeyCode::Down => app.history_next(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Home => app.move_cursor_home(),
        KeyCode::End => app.move_cursor_end(),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Tab => app.insert_str("    "),
        KeyCode::Enter => {
            if app.input.trim() == "\"\"\"" {
                match app.input_mode {
                    InputMode::Normal => {
                        app.clear_input();
                        app.input_mode = InputMode::MultiLine;
                    }
                    InputMode::MultiLine => {
                        let block = app.multiline_buffer.join("\n");
                        app.clear_input();
                        submit(app, services, block);
                    }
                }
            } else if app.input_mode == InputMode::MultiLine {
                app.newline();
            } else {
                let line = app.input_text();
                app.clear_input();
                submit(app, services, line);
            }
        }
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
    false
}

fn submit(app: &mut App, services: &Services, text: String) {
    if text.trim().is_empty() {
        return;
    }
    app.push_history(text.clone());
    let _ = services.tx.send(TuiEvent::Submit(text));
}
