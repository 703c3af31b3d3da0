//! Scripted stand-in for the Python kernel.
//!
//! Understands one statement per line:
//! `name = 41`, `name = 'text'`, `print('text')`, `print(name)`, `print(name + 1)`,
//! `raise Kind('message')`, `1/0`, `sleep(ms)`, `while True: pass`, `crash()`
//! and `import name` (ignored).

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use pycourse::runtime::{Engine, EngineError, EngineLauncher, RunOutcome, ScriptFailure};

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Int(i64),
    Str(String),
}

impl Value {
    fn render(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Str(s) => s.clone(),
        }
    }
}

#[derive(Default)]
struct State {
    vars: BTreeMap<String, Value>,
    buffer: String,
    capturing: bool,
}

pub struct ScriptedEngine {
    pub id: usize,
    state: Mutex<State>,
    failing_packages: HashSet<String>,
    pub loaded: Mutex<Vec<String>>,
    pub installed: Mutex<Vec<String>>,
    pub runs: Mutex<Vec<String>>,
    pub terminated: AtomicBool,
}

enum Step {
    Done,
    Sleep(u64),
    Hang,
    Raise(ScriptFailure),
    Crash,
}

impl ScriptedEngine {
    pub fn new(id: usize, failing_packages: HashSet<String>) -> Self {
        Self {
            id,
            state: Mutex::new(State::default()),
            failing_packages,
            loaded: Mutex::new(Vec::new()),
            installed: Mutex::new(Vec::new()),
            runs: Mutex::new(Vec::new()),
            terminated: AtomicBool::new(false),
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    fn step(&self, line: &str) -> Step {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("import ") {
            return Step::Done;
        }
        if line == "while True: pass" {
            return Step::Hang;
        }
        if line == "crash()" {
            return Step::Crash;
        }
        if line == "1/0" {
            return Step::Raise(ScriptFailure::new("ZeroDivisionError", "division by zero"));
        }
        if let Some(ms) = call_arg(line, "sleep") {
            return Step::Sleep(ms.parse().unwrap_or(0));
        }
        if let Some(rest) = line.strip_prefix("raise ") {
            let (kind, arg) = rest.split_once('(').unwrap_or((rest, ")"));
            let message = unquote(arg.trim_end_matches(')')).unwrap_or_default();
            return Step::Raise(ScriptFailure::new(kind.trim(), message));
        }

        let mut state = self.state.lock().unwrap();
        if let Some(arg) = call_arg(line, "print") {
            let text = if let Some(s) = unquote(arg) {
                s
            } else if let Some((name, n)) = arg.split_once('+') {
                match (state.vars.get(name.trim()), n.trim().parse::<i64>()) {
                    (Some(Value::Int(v)), Ok(n)) => (v + n).to_string(),
                    (None, _) => return name_error(name.trim()),
                    _ => return Step::Raise(ScriptFailure::new("TypeError", "unsupported operand")),
                }
            } else {
                match state.vars.get(arg.trim()) {
                    Some(v) => v.render(),
                    None => return name_error(arg.trim()),
                }
            };
            state.buffer.push_str(&text);
            state.buffer.push('\n');
            return Step::Done;
        }
        if let Some((name, value)) = line.split_once('=') {
            let value = value.trim();
            let value = match unquote(value) {
                Some(s) => Value::Str(s),
                None => match value.parse::<i64>() {
                    Ok(n) => Value::Int(n),
                    Err(_) => return Step::Raise(ScriptFailure::new("SyntaxError", "invalid syntax")),
                },
            };
            state.vars.insert(name.trim().to_string(), value);
            return Step::Done;
        }
        Step::Raise(ScriptFailure::new("SyntaxError", "invalid syntax"))
    }
}

fn name_error(name: &str) -> Step {
    Step::Raise(ScriptFailure::new("NameError", format!("name '{}' is not defined", name)))
}

fn call_arg<'a>(line: &'a str, func: &str) -> Option<&'a str> {
    line.strip_prefix(func)?.strip_prefix('(')?.strip_suffix(')')
}

fn unquote(s: &str) -> Option<String> {
    let s = s.trim();
    for q in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return Some(s[1..s.len() - 1].to_string());
        }
    }
    None
}

#[async_trait]
impl Engine for ScriptedEngine {
    fn describe(&self) -> String {
        format!("scripted #{}", self.id)
    }

    async fn load_package(&self, name: &str) -> Result<(), EngineError> {
        if self.failing_packages.contains(name) {
            return Err(EngineError::Package { name: name.into(), message: "No module named".into() });
        }
        self.loaded.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn install_package(&self, name: &str) -> Result<(), EngineError> {
        if self.failing_packages.contains(name) {
            return Err(EngineError::Package { name: name.into(), message: "install failed".into() });
        }
        self.installed.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn reset_output(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.buffer.clear();
        state.capturing = true;
        Ok(())
    }

    async fn run(&self, source: &str) -> Result<RunOutcome, EngineError> {
        if self.is_terminated() {
            return Err(EngineError::Exited("terminated".into()));
        }
        self.runs.lock().unwrap().push(source.to_string());
        for line in source.lines() {
            match self.step(line) {
                Step::Done => {}
                Step::Sleep(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
                Step::Hang => std::future::pending::<()>().await,
                Step::Raise(failure) => return Ok(RunOutcome::Raised(failure)),
                Step::Crash => return Err(EngineError::Exited("kernel closed its output".into())),
            }
        }
        Ok(RunOutcome::Completed)
    }

    async fn drain_output(&self) -> Result<String, EngineError> {
        let mut state = self.state.lock().unwrap();
        state.capturing = false;
        Ok(std::mem::take(&mut state.buffer))
    }

    async fn global_names(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.state.lock().unwrap().vars.keys().cloned().collect())
    }

    async fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }
}

/// Launcher that counts launches and can be told to fail.
#[derive(Default)]
pub struct FakeLauncher {
    pub launches: AtomicUsize,
    pub fail_launch: AtomicBool,
    pub delay: Mutex<Duration>,
    pub failing_packages: Mutex<HashSet<String>>,
    pub engines: Mutex<Vec<Arc<ScriptedEngine>>>,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        let launcher = Self::default();
        *launcher.delay.lock().unwrap() = delay;
        Arc::new(launcher)
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail_launch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_package(&self, name: &str) {
        self.failing_packages.lock().unwrap().insert(name.to_string());
    }

    pub fn engine(&self, index: usize) -> Arc<ScriptedEngine> {
        Arc::clone(&self.engines.lock().unwrap()[index])
    }
}

#[async_trait]
impl EngineLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Arc<dyn Engine>, EngineError> {
        let id = self.launches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(EngineError::Launch("interpreter not found".into()));
        }
        let engine = Arc::new(ScriptedEngine::new(id, self.failing_packages.lock().unwrap().clone()));
        self.engines.lock().unwrap().push(Arc::clone(&engine));
        Ok(engine)
    }
}
