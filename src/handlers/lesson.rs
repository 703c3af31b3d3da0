//! Lesson handlers: catalog listing, section display and running a section's examples.

use anyhow::{anyhow, Result};
use owo_colors::OwoColorize;

use crate::course::{BlockKind, Course, COURSE_TITLE};
use crate::execution::SessionController;
use crate::printer::{MarkdownPrinter, ResultPrinter, TextPrinter};

pub fn list(course: &Course) {
    println!("{}", COURSE_TITLE.bold());
    for module in course.modules() {
        println!("\n{}  {}", module.title.cyan().bold(), format!("[{}]", module.id).dimmed());
        if !module.description.is_empty() {
            println!("  {}", module.description);
        }
        for section in &module.sections {
            let exercises: Vec<&str> = section.exercises().map(|e| e.id).collect();
            let suffix = if exercises.is_empty() {
                String::new()
            } else {
                format!("  exercises: {}", exercises.join(", "))
            };
            println!("  {:<16} {}{}", section.id.green(), section.title, suffix.dimmed());
        }
    }
}

pub fn show(course: &Course, section_id: &str, markdown: bool) -> Result<()> {
    let located = course
        .section(section_id)
        .ok_or_else(|| anyhow!("unknown section '{}' (see --list)", section_id))?;
    let md = MarkdownPrinter::default();
    let heading = TextPrinter { color: Some("cyan") };

    heading.print(&format!("{} / {}", located.module.title, located.section.title));
    println!();
    for block in &located.section.blocks {
        match block.kind {
            BlockKind::Markdown if markdown => md.print(&block.content),
            BlockKind::Markdown => println!("{}\n", block.content),
            BlockKind::CodeExample => {
                if let Some(title) = &block.title {
                    println!("{}", title.bold());
                }
                if markdown {
                    md.print_code(&block.content);
                } else {
                    println!("{}\n", block.content);
                }
            }
            BlockKind::Exercise => {
                let title = block.title.as_deref().unwrap_or("Exercise");
                println!("{}", title.yellow().bold());
                if markdown {
                    md.print(&block.content);
                } else {
                    println!("{}\n", block.content);
                }
                if let Some(id) = &block.id {
                    println!("{}\n", format!("  pycourse --exercise {} --editor --check", id).dimmed());
                }
            }
            BlockKind::Quiz => {
                println!("{} {}", "Quiz:".magenta().bold(), block.content);
                println!("{}\n", format!("  pycourse --quiz {}", section_id).dimmed());
            }
        }
        if block.visual_prompt.is_some() {
            println!("{}\n", format!("  (figure: pycourse --figure {})", section_id).dimmed());
        }
    }

    let neighbors = course.neighbors(section_id);
    if let Some(prev) = neighbors.previous {
        println!("{} {} [{}]", "<- previous:".dimmed(), prev.section.title, prev.section.id);
    }
    if let Some(next) = neighbors.next {
        println!("{} {} [{}]", "-> next:".dimmed(), next.section.title, next.section.id);
    }
    Ok(())
}

/// Run every code example of a section in order, sharing one namespace.
pub async fn run_examples(
    controller: &SessionController,
    course: &Course,
    section_id: &str,
    color: bool,
) -> Result<bool> {
    let located = course
        .section(section_id)
        .ok_or_else(|| anyhow!("unknown section '{}' (see --list)", section_id))?;
    let printer = ResultPrinter { color };
    let md = MarkdownPrinter::default();
    let mut all_ok = true;

    for (i, block) in located.section.runnable_blocks().enumerate() {
        let label = block.title.clone().unwrap_or_else(|| format!("Example {}", i + 1));
        println!("{}", label.cyan().bold());
        if color {
            md.print_code(&block.content);
        } else {
            println!("{}", block.content);
        }
        let result = controller.execute(block.content.as_str()).await;
        printer.print(&result);
        println!();
        all_ok &= result.is_success();
    }
    Ok(all_ok)
}
