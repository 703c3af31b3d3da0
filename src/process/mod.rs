//! Interpreter process management (startup/IO/health).

use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{Child, ChildStdin, ChildStdout, Command},
};

pub mod python;

pub struct ProcessHandle {
    pub child: Child,
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
}

/// Spawn `program -u -c <bootstrap>` with piped stdio.
///
/// The child's stderr is forwarded line by line to `tracing` at debug level.
pub fn start_interpreter(program: &str, bootstrap: &str) -> Result<ProcessHandle> {
    let mut cmd = Command::new(program);
    cmd.arg("-u") // unbuffered
        .arg("-c")
        .arg(bootstrap)
        .env("PYTHONIOENCODING", "utf-8")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child: Child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn interpreter '{}'", program))?;
    let stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
    let stdout = child.stdout.take().ok_or_else(|| anyhow!("no stdout"))?;

    if let Some(stderr) = child.stderr.take() {
        let pid = child.id();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(target: "pycourse::kernel", pid = ?pid, "{}", line);
            }
        });
    }

    Ok(ProcessHandle { child, stdin, stdout })
}
