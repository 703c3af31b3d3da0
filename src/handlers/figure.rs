//! Figure handler: generate the illustrations a section asks for.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use owo_colors::OwoColorize;

use crate::course::Course;
use crate::tutor::{Figure, Tutor};

const UNAVAILABLE: &str = "Figure unavailable (check API_KEY and the image model).";

pub async fn run(tutor: &Tutor, course: &Course, section_id: &str, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let located = course
        .section(section_id)
        .ok_or_else(|| anyhow!("unknown section '{}' (see --list)", section_id))?;
    let prompts: Vec<&str> = located.section.visual_prompts().collect();
    if prompts.is_empty() {
        println!("{}", format!("Section '{}' has no figures.", section_id).dimmed());
        return Ok(Vec::new());
    }

    fs::create_dir_all(out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;
    let mut saved = Vec::new();
    for (i, prompt) in prompts.iter().enumerate() {
        println!("{} {}", "Generating:".cyan(), prompt);
        let written = match tutor.generate_figure(prompt).await {
            Some(figure) => save(&figure, out_dir, &format!("{}-{}", section_id, i + 1))?,
            None => None,
        };
        match written {
            Some(path) => {
                println!("{} {}", "Saved".green(), path.display());
                saved.push(path);
            }
            None => println!("{}", UNAVAILABLE.yellow()),
        }
    }
    Ok(saved)
}

/// Write the decoded image as `<stem>.<ext>`. A payload that is not valid base64
/// yields `None`; only filesystem errors are fatal.
pub fn save(figure: &Figure, out_dir: &Path, stem: &str) -> Result<Option<PathBuf>> {
    let bytes = match figure.decode() {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "discarding undecodable figure");
            return Ok(None);
        }
    };
    let path = out_dir.join(format!("{}.{}", stem, figure.extension()));
    fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(Some(path))
}
