//! TUI application state for the sandbox REPL.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::execution::{ExecutionResult, SandboxStatus};
use crate::utils::unicode::char_to_byte_index;

/// Input mode for the TUI
#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    /// Normal single-line input mode
    Normal,
    /// Multi-line input mode (activated by """)
    MultiLine,
}

/// What a submitted line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Run(String),
    /// `?question` goes to the course assistant.
    Ask(String),
    /// `:vars`
    Variables,
    /// `:retry`
    Retry,
    /// `:help`
    Help,
    /// `:clear`
    Clear,
    /// `:quit`, `exit()`
    Quit,
    /// Unrecognised `:command`.
    Unknown(String),
}

impl ReplCommand {
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(question) = trimmed.strip_prefix('?') {
            let question = question.trim();
            return (!question.is_empty()).then(|| Self::Ask(question.to_string()));
        }
        if let Some(cmd) = trimmed.strip_prefix(':') {
            return Some(match cmd.trim() {
                "vars" | "v" => Self::Variables,
                "retry" => Self::Retry,
                "help" | "h" => Self::Help,
                "clear" => Self::Clear,
                "quit" | "q" => Self::Quit,
                other => Self::Unknown(other.to_string()),
            });
        }
        if trimmed == "exit()" || trimmed == "quit()" {
            return Some(Self::Quit);
        }
        // keep leading indentation of the first line intact
        Some(Self::Run(input.trim_end().to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Code,
    Output,
    Error,
    Question,
    Answer,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryKind,
    pub text: String,
}

/// Popup display state
#[derive(Debug, Clone, PartialEq)]
pub enum PopupState {
    None,
    Variables(Vec<String>),
}

#[derive(Debug)]
pub struct App {
    /// Transcript of runs, answers and notices
    pub entries: Vec<Entry>,
    pub input: String,
    /// Cursor position in input (character index)
    pub input_cursor: usize,
    pub input_mode: InputMode,
    pub multiline_buffer: Vec<String>,
    pub input_history: Vec<String>,
    /// Current history index when navigating (None = new line)
    pub history_index: Option<usize>,
    /// A run or an assistant request is in flight
    pub busy: bool,
    /// Submissions waiting for the in-flight one to settle
    pub pending: VecDeque<String>,
    /// Latest sandbox status snapshot
    pub status: SandboxStatus,
    pub assistant_enabled: bool,
    pub show_help: bool,
    pub scroll_offset: usize,
    pub max_entries: usize,
    pub popup_state: PopupState,
    pub last_ctrl_c_time: Option<Instant>,
}

impl App {
    pub fn new(assistant_enabled: bool) -> Self {
        Self {
            entries: Vec::new(),
            input: String::new(),
            input_cursor: 0,
            input_mode: InputMode::Normal,
            multiline_buffer: Vec::new(),
            input_history: Vec::new(),
            history_index: None,
            busy: false,
            pending: VecDeque::new(),
            status: SandboxStatus::Uninitialized,
            assistant_enabled,
            show_help: false,
            scroll_offset: 0,
            max_entries: 500,
            popup_state: PopupState::None,
            last_ctrl_c_time: None,
        }
    }

    pub fn push_entry(&mut self, kind: EntryKind, text: impl Into<String>) {
        self.entries.push(Entry { kind, text: text.into() });
        if self.entries.len() > self.max_entries {
            self.entries.drain(0..self.entries.len() - self.max_entries);
        }
        self.scroll_to_bottom();
    }

    pub fn record_result(&mut self, result: &ExecutionResult) {
        let output = result.output.trim_end_matches('\n');
        if !output.is_empty() {
            self.push_entry(EntryKind::Output, output);
        }
        if let Some(err) = &result.error {
            self.push_entry(EntryKind::Error, err.clone());
        }
    }

    /// Queue the submission if something is in flight; returns false when it may run now.
    pub fn try_queue(&mut self, submission: String) -> bool {
        if self.busy {
            self.pending.push_back(submission);
            true
        } else {
            false
        }
    }

    pub fn dequeue(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.input_cursor = 0;
        self.multiline_buffer.clear();
        self.input_mode = InputMode::Normal;
        self.history_index = None;
    }

    pub fn input_text(&self) -> String {
        match self.input_mode {
            InputMode::MultiLine => {
                let mut lines = self.multiline_buffer.clone();
                lines.push(self.input.clone());
                lines.join("\n")
            }
            InputMode::Normal => self.input.clone(),
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset += 1;
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    // ----- Input editing helpers -----
    pub fn move_cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.input_cursor < self.input.chars().count() {
            self.input_cursor += 1;
        }
    }

    pub fn move_cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.input_cursor = self.input.chars().count();
    }

    pub fn insert_char(&mut self, c: char) {
        let at = char_to_byte_index(&self.input, self.input_cursor);
        self.input.insert(at, c);
        self.input_cursor += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' {
                self.newline();
            } else if c != '\r' {
                self.insert_char(c);
            }
        }
    }

    /// Break the current line, entering multi-line mode.
    pub fn newline(&mut self) {
        let at = char_to_byte_index(&self.input, self.input_cursor);
        let rest = self.input.split_off(at);
        self.multiline_buffer.push(std::mem::replace(&mut self.input, rest));
        self.input_cursor = 0;
        self.input_mode = InputMode::MultiLine;
    }

    pub fn backspace(&mut self) {
        if self.input_cursor > 0 {
            let at = char_to_byte_index(&self.input, self.input_cursor - 1);
            self.input.remove(at);
            self.input_cursor -= 1;
        } else if self.input_mode == InputMode::MultiLine {
            // merge with the previous line
            if let Some(previous) = self.multiline_buffer.pop() {
                self.input_cursor = previous.chars().count();
                self.input = previous + &self.input;
            }
        }
    }

    pub fn delete(&mut self) {
        if self.input_cursor < self.input.chars().count() {
            let at = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(at);
        }
    }

    /// Text left of the cursor, for cursor placement.
    pub fn input_before_cursor(&self) -> &str {
        &self.input[..char_to_byte_index(&self.input, self.input_cursor)]
    }

    pub fn push_history(&mut self, line: String) {
        if !line.trim().is_empty() && self.input_history.last() != Some(&line) {
            self.input_history.push(line);
        }
        self.history_index = None;
    }

    pub fn history_prev(&mut self) {
        if self.input_history.is_empty() {
            return;
        }
        let i = match self.history_index {
            None => self.input_history.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.history_index = Some(i);
        self.load_history(i);
    }

    pub fn history_next(&mut self) {
        match self.history_index {
            Some(i) if i + 1 < self.input_history.len() => {
                self.history_index = Some(i + 1);
                self.load_history(i + 1);
            }
            Some(_) => {
                self.history_index = None;
                self.input.clear();
                self.input_cursor = 0;
            }
            None => {}
        }
    }

    fn load_history(&mut self, i: usize) {
        let entry = self.input_history[i].clone();
        match entry.split_once('\n') {
            Some(_) => {
                let mut lines: Vec<String> = entry.lines().map(str::to_string).collect();
                self.input = lines.pop().unwrap_or_default();
                self.multiline_buffer = lines;
                self.input_mode = InputMode::MultiLine;
            }
            None => {
                self.input = entry;
                self.multiline_buffer.clear();
                self.input_mode = InputMode::Normal;
            }
        }
        self.move_cursor_end();
    }

    pub fn show_variables(&mut self, names: Vec<String>) {
        self.popup_state = PopupState::Variables(names);
    }

    pub fn hide_popup(&mut self) {
        self.popup_state = PopupState::None;
    }

    pub fn is_popup_shown(&self) -> bool {
        self.popup_state != PopupState::None
    }

    /// Clear input on a single Ctrl+C; returns true on a double press.
    pub fn handle_ctrl_c(&mut self) -> bool {
        const DOUBLE_CTRL_C_TIMEOUT: Duration = Duration::from_millis(500);

        let now = Instant::now();
        if let Some(last) = self.last_ctrl_c_time {
            if now.duration_since(last) <= DOUBLE_CTRL_C_TIMEOUT {
                self.last_ctrl_c_time = None;
                return true;
            }
        }
        self.clear_input();
        self.last_ctrl_c_time = Some(now);
        false
    }
}
