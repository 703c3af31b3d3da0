//! Ask handler: one question to the course assistant.

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::config::Config;
use crate::course::Course;
use crate::printer::render_segments;
use crate::tutor::{parse_segments, ChatAssistant, Segment};

pub async fn run(cfg: &Config, course: &Course, question: &str, color: bool) -> Result<()> {
    let mut assistant = ChatAssistant::from_config(cfg, course)?;
    let reply = assistant.send(question).await;
    let segments = parse_segments(&reply);
    println!("{}", render_segments(&segments, color));

    let targets: Vec<_> = segments.iter().filter_map(|s| s.resolve(course)).collect();
    if !targets.is_empty() {
        println!();
        for target in targets {
            println!("{} pycourse --show {}", "->".cyan(), target.section.id);
        }
    }
    let dangling = segments
        .iter()
        .filter(|s| matches!(s, Segment::Link { .. }) && s.resolve(course).is_none())
        .count();
    if dangling > 0 {
        tracing::debug!(dangling, "assistant referenced unknown sections");
    }
    Ok(())
}
