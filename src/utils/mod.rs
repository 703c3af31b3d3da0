//! Utilities: reading learner code from files, stdin or an editor.

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};

pub mod unicode;

/// Read Python source from a file, or from stdin when `path` is `-`.
pub fn read_source_file(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("failed to read code from stdin")?;
        return Ok(buf);
    }

    let p = Path::new(path);
    if !p.exists() {
        bail!("Source file '{}' does not exist", path);
    }
    if !p.is_file() {
        bail!("'{}' is not a file", path);
    }
    fs::read_to_string(p).with_context(|| format!("Failed to read file '{}'", path))
}

/// Open `$VISUAL`/`$EDITOR` on a temporary `.py` file seeded with `initial`
/// and return what was saved.
pub fn edit_in_editor(initial: &str) -> Result<String> {
    let editor = std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .unwrap_or_else(|_| if cfg!(windows) { "notepad".into() } else { "vi".into() });

    let file = tempfile::Builder::new()
        .prefix("pycourse-")
        .suffix(".py")
        .tempfile()
        .context("failed to create a temporary file")?;
    fs::write(file.path(), initial)?;

    // EDITOR may carry arguments, e.g. "code --wait"
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("vi");
    let status = Command::new(program)
        .args(parts)
        .arg(file.path())
        .status()
        .with_context(|| format!("failed to launch editor '{}'", editor))?;
    if !status.success() {
        bail!("editor '{}' exited with {}", editor, status);
    }
    fs::read_to_string(file.path()).context("failed to read edited file")
}
