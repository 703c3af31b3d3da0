//! Printers: text, markdown (termimad) and execution results.

use owo_colors::OwoColorize;
use termimad::MadSkin;

use crate::execution::ExecutionResult;
use crate::tutor::Segment;

pub struct TextPrinter {
    pub color: Option<&'static str>,
}

impl TextPrinter {
    pub fn print(&self, text: &str) {
        match self.color {
            Some("green") => println!("{}", text.green()),
            Some("cyan") => println!("{}", text.cyan()),
            Some("magenta") => println!("{}", text.magenta()),
            Some("yellow") => println!("{}", text.yellow()),
            Some("red") => println!("{}", text.red()),
            _ => println!("{}", text),
        }
    }
}

#[derive(Default)]
pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
        println!();
    }

    pub fn print_code(&self, code: &str) {
        self.print(&format!("```python\n{}\n```", code.trim_end()));
    }
}

/// Console rendering of an [`ExecutionResult`]: stdout first, then the error flagged in red.
pub struct ResultPrinter {
    pub color: bool,
}

impl ResultPrinter {
    pub fn print(&self, result: &ExecutionResult) {
        let output = result.output.trim_end_matches('\n');
        if !output.is_empty() {
            println!("{}", output);
        }
        match (&result.error, self.color) {
            (Some(err), true) => println!("{} {}", "Error:".red().bold(), err.red()),
            (Some(err), false) => println!("Error: {}", err),
            (None, _) if output.is_empty() => {
                if self.color {
                    println!("{}", "(no output)".dimmed());
                } else {
                    println!("(no output)");
                }
            }
            (None, _) => {}
        }
    }
}

/// Plain rendering of assistant segments: links become `Label -> section-id`.
pub fn render_segments(segments: &[Segment], color: bool) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Code(code) if color => out.push_str(&code.yellow().to_string()),
            Segment::Code(code) => {
                out.push('`');
                out.push_str(code);
                out.push('`');
            }
            Segment::Link { label, section_id, .. } if color => {
                out.push_str(&format!("{} {}", label.blue().underline(), format!("[{}]", section_id).dimmed()));
            }
            Segment::Link { label, section_id, .. } => out.push_str(&format!("{} [{}]", label, section_id)),
        }
    }
    out
}
