//! UI layout and rendering logic for the TUI.

use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use super::app::{App, EntryKind, InputMode, PopupState};
use crate::execution::SandboxStatus;
use crate::utils::unicode::truncate_to_width;

pub fn render_ui(frame: &mut Frame, app: &App) {
    let input_height = match app.input_mode {
        InputMode::Normal => 3,
        InputMode::MultiLine => (app.multiline_buffer.len() as u16 + 3).min(12),
    };
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),               // Transcript
            Constraint::Length(input_height), // Input area
            Constraint::Length(1),            // Status bar
        ])
        .split(frame.area());

    render_transcript(frame, app, main_layout[0]);
    render_input_area(frame, app, main_layout[1]);
    render_status_bar(frame, app, main_layout[2]);

    if app.show_help {
        render_help_overlay(frame, app);
    }
    if let PopupState::Variables(names) = &app.popup_state {
        render_variables_popup(frame, names);
    }
}

fn entry_style(kind: EntryKind) -> (&'static str, Style) {
    match kind {
        EntryKind::Code => (">>> ", Style::default().fg(Color::Green)),
        EntryKind::Output => ("", Style::default()),
        EntryKind::Error => ("! ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        EntryKind::Question => ("? ", Style::default().fg(Color::Magenta)),
        EntryKind::Answer => ("", Style::default().fg(Color::Cyan)),
        EntryKind::Info => ("# ", Style::default().fg(Color::DarkGray)),
    }
}

fn render_transcript(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();
    for entry in &app.entries {
        let (prefix, style) = entry_style(entry.kind);
        for (i, line) in entry.text.lines().enumerate() {
            let lead = match (i, entry.kind) {
                (0, _) => prefix,
                (_, EntryKind::Code) => "... ",
                _ => "",
            };
            lines.push(Line::from(vec![Span::styled(format!("{}{}", lead, line), style)]));
        }
        if entry.kind != EntryKind::Code {
            lines.push(Line::from(""));
        }
    }

    let available = area.height.saturating_sub(2) as usize;
    let total = lines.len();
    let mut paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("Python Sandbox"))
        .wrap(Wrap { trim: false });

    if total > available {
        // offset 0 keeps the latest lines in view
        let max_scroll = total - available;
        let scroll_y = max_scroll - app.scroll_offset.min(max_scroll);
        paragraph = paragraph.scroll((scroll_y as u16, 0));
    }

    frame.render_widget(paragraph, area);
}

fn render_input_area(frame: &mut Frame, app: &App, area: Rect) {
    let text = match app.input_mode {
        InputMode::Normal => app.input.clone(),
        InputMode::MultiLine => {
            let mut lines = app.multiline_buffer.clone();
            lines.push(app.input.clone());
            lines.join("\n")
        }
    };
    let title = match app.input_mode {
        InputMode::Normal => "Input (\"\"\" for multi-line, ?question, :help)",
        InputMode::MultiLine => "Multi-line input (\"\"\" on its own line to run)",
    };

    let visible_rows = area.height.saturating_sub(2) as usize;
    let skip = (app.multiline_buffer.len() + 1).saturating_sub(visible_rows);
    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((skip as u16, 0));
    frame.render_widget(paragraph, area);

    let row = match app.input_mode {
        InputMode::Normal => 0,
        InputMode::MultiLine => app.multiline_buffer.len() - skip,
    };
    let col = app.input_before_cursor().width() as u16;
    let x = (area.x + 1 + col).min(area.right().saturating_sub(2));
    frame.set_cursor_position(Position::new(x, area.y + 1 + row as u16));
}

fn status_style(status: &SandboxStatus) -> Style {
    let bg = match status {
        SandboxStatus::Ready | SandboxStatus::Idle => Color::Green,
        SandboxStatus::Loading | SandboxStatus::Running => Color::Yellow,
        SandboxStatus::Failed(_) => Color::Red,
        SandboxStatus::Uninitialized => Color::DarkGray,
    };
    Style::default().bg(bg).fg(Color::Black).add_modifier(Modifier::BOLD)
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let label = truncate_to_width(&app.status.to_string(), (area.width as usize / 2).max(12));
    let mut spans = vec![
        Span::styled(format!(" sandbox: {} ", label), status_style(&app.status)),
        Span::raw(" "),
    ];
    if !app.pending.is_empty() {
        spans.push(Span::raw(format!("{} queued | ", app.pending.len())));
    }
    if matches!(app.status, SandboxStatus::Failed(_)) {
        spans.push(Span::raw(":retry to restart | "));
    }
    spans.push(Span::raw("F1 help | Ctrl+C twice to quit"));

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(paragraph, area);
}

fn render_help_overlay(frame: &mut Frame, app: &App) {
    let popup_area = centered_rect(80, 70, frame.area());
    frame.render_widget(Clear, popup_area);

    let mut help_lines = vec![
        Line::from("Sandbox REPL Help"),
        Line::from(""),
        Line::from("Running code:"),
        Line::from("  Enter      - Run the current line"),
        Line::from("  \"\"\"        - Start/end a multi-line block"),
        Line::from("  Tab        - Insert four spaces"),
        Line::from("  ↑/↓        - Input history"),
        Line::from("  PgUp/PgDn  - Scroll the transcript"),
        Line::from(""),
        Line::from("Commands:"),
        Line::from("  :vars      - Names defined in the session"),
        Line::from("  :retry     - Restart a failed sandbox"),
        Line::from("  :clear     - Clear the transcript"),
        Line::from("  :quit      - Leave (also exit(), Ctrl+D)"),
    ];
    if app.assistant_enabled {
        help_lines.push(Line::from("  ?question  - Ask the course assistant"));
    }
    help_lines.push(Line::from(""));
    help_lines.push(Line::from("Output is limited by the execution timeout; a run that exceeds it"));
    help_lines.push(Line::from("restarts the interpreter and clears earlier definitions."));

    let paragraph = Paragraph::new(Text::from(help_lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help (Esc to close)")
                .title_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, popup_area);
}

fn render_variables_popup(frame: &mut Frame, names: &[String]) {
    let popup_area = centered_rect(60, 60, frame.area());
    frame.render_widget(Clear, popup_area);

    let body = if names.is_empty() {
        "No variables defined yet.".to_string()
    } else {
        names.join("\n")
    };
    let paragraph = Paragraph::new(body)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Session variables ({})", names.len()))
                .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, popup_area);
}

/// Helper function to create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
