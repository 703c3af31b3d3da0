//! Splits assistant replies into text, inline code and course navigation links.
//!
//! Links use the form `[[Label]](goto:module-id|section-id)`. Markup that does
//! not fit that form is kept as plain text.

use std::sync::OnceLock;

use regex::Regex;

use crate::course::{Course, Located};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Code(String),
    Link { label: String, module_id: String, section_id: String },
}

impl Segment {
    pub fn resolve<'a>(&self, course: &'a Course) -> Option<Located<'a>> {
        match self {
            Segment::Link { module_id, section_id, .. } => course.resolve_link(module_id, section_id),
            _ => None,
        }
    }
}

fn markup() -> &'static Regex {
    static MARKUP: OnceLock<Regex> = OnceLock::new();
    MARKUP.get_or_init(|| {
        Regex::new(r"\[\[(?P<label>.*?)\]\]\(goto:(?P<target>.*?)\)|`(?P<code>[^`]+)`")
            .expect("navigation markup pattern is valid")
    })
}

pub fn parse_segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for caps in markup().captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        push_text(&mut segments, &text[last..whole.start()]);
        last = whole.end();

        if let Some(code) = caps.name("code") {
            segments.push(Segment::Code(code.as_str().to_string()));
            continue;
        }
        let label = caps.name("label").map_or("", |m| m.as_str());
        let target = caps.name("target").map_or("", |m| m.as_str());
        match target.split_once('|') {
            Some((module_id, section_id)) if !module_id.trim().is_empty() && !section_id.trim().is_empty() => {
                segments.push(Segment::Link {
                    label: label.to_string(),
                    module_id: module_id.trim().to_string(),
                    section_id: section_id.trim().to_string(),
                });
            }
            _ => push_text(&mut segments, whole.as_str()),
        }
    }
    push_text(&mut segments, &text[last..]);
    segments
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Text(prev)) = segments.last_mut() {
        prev.push_str(text);
    } else {
        segments.push(Segment::Text(text.to_string()));
    }
}

/// Every link in `text`, in order of appearance.
pub fn links(text: &str) -> Vec<Segment> {
    parse_segments(text)
        .into_iter()
        .filter(|s| matches!(s, Segment::Link { .. }))
        .collect()
}
