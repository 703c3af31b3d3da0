//! Interpreter runtime manager: lazy, exactly-once engine bootstrap.
//!
//! The first caller of [`RuntimeManager::acquire`] starts the bootstrap; every
//! caller that arrives while it is in flight awaits the same shared future, so
//! the engine is launched and provisioned once no matter how many requests race.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
    time::{Duration, Instant},
};

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;

use crate::config::Config;

pub mod engine;

pub use engine::{Engine, EngineError, EngineLauncher, RunOutcome, ScriptFailure};

#[derive(Error, Debug, Clone)]
pub enum BootstrapError {
    #[error("interpreter bootstrap failed: {0}")]
    Engine(#[from] EngineError),
    #[error("interpreter bootstrap timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

/// Packages and limits applied when the engine is first brought up.
#[derive(Debug, Clone, Default)]
pub struct BootstrapPlan {
    /// Helper used to install missing packages (`pip`); loaded before anything else.
    pub package_manager: Option<String>,
    /// Prebuilt packages imported during bootstrap.
    pub preload: Vec<String>,
    /// Packages installed through the package manager when not importable.
    pub install: Vec<String>,
    pub timeout: Option<Duration>,
    /// Treat a failed bootstrap like an uninitialized one on the next acquisition.
    pub auto_retry: bool,
}

impl BootstrapPlan {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            package_manager: cfg.get_list("PACKAGE_MANAGER").into_iter().next(),
            preload: cfg.get_list("PRELOAD_PACKAGES"),
            install: cfg.get_list("INSTALL_PACKAGES"),
            timeout: cfg.get_duration("BOOTSTRAP_TIMEOUT"),
            auto_retry: cfg.get_bool("AUTO_RETRY_BOOTSTRAP"),
        }
    }
}

/// Reference to a ready engine and the packages provisioned into it.
#[derive(Clone)]
pub struct RuntimeHandle {
    engine: Arc<dyn Engine>,
    packages: Arc<[String]>,
    generation: u64,
}

impl RuntimeHandle {
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    /// Increments every time a new engine is bootstrapped.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn same_engine(&self, other: &RuntimeHandle) -> bool {
        Arc::ptr_eq(&self.engine, &other.engine)
    }
}

impl fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("engine", &self.engine.describe())
            .field("packages", &self.packages)
            .field("generation", &self.generation)
            .finish()
    }
}

type PendingBootstrap = Shared<BoxFuture<'static, Result<RuntimeHandle, BootstrapError>>>;

pub enum InitializationState {
    Uninitialized,
    Initializing { generation: u64, pending: PendingBootstrap },
    Ready(RuntimeHandle),
    Failed(BootstrapError),
}

impl fmt::Debug for InitializationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("Uninitialized"),
            Self::Initializing { generation, .. } => {
                f.debug_struct("Initializing").field("generation", generation).finish()
            }
            Self::Ready(handle) => f.debug_tuple("Ready").field(handle).finish(),
            Self::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
        }
    }
}

/// Snapshot of [`InitializationState`] without the handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeStatus {
    Uninitialized,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Clone)]
pub struct RuntimeManager {
    inner: Arc<Inner>,
}

struct Inner {
    launcher: Arc<dyn EngineLauncher>,
    plan: BootstrapPlan,
    state: Mutex<InitializationState>,
    generations: AtomicU64,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, InitializationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the outcome unless the state moved on to another bootstrap meanwhile.
    fn settle(&self, generation: u64, outcome: &Result<RuntimeHandle, BootstrapError>) -> bool {
        let mut state = self.lock_state();
        match &*state {
            InitializationState::Initializing { generation: current, .. } if *current == generation => {
                *state = match outcome {
                    Ok(handle) => InitializationState::Ready(handle.clone()),
                    Err(err) => InitializationState::Failed(err.clone()),
                };
                true
            }
            _ => false,
        }
    }
}

impl RuntimeManager {
    pub fn new(launcher: Arc<dyn EngineLauncher>, plan: BootstrapPlan) -> Self {
        Self {
            inner: Arc::new(Inner {
                launcher,
                plan,
                state: Mutex::new(InitializationState::Uninitialized),
                generations: AtomicU64::new(0),
            }),
        }
    }

    pub fn plan(&self) -> &BootstrapPlan {
        &self.inner.plan
    }

    pub fn status(&self) -> RuntimeStatus {
        match &*self.inner.lock_state() {
            InitializationState::Uninitialized => RuntimeStatus::Uninitialized,
            InitializationState::Initializing { .. } => RuntimeStatus::Loading,
            InitializationState::Ready(_) => RuntimeStatus::Ready,
            InitializationState::Failed(err) => RuntimeStatus::Failed(err.to_string()),
        }
    }

    /// Return the ready engine, bootstrapping it first if nobody has yet.
    pub async fn acquire(&self) -> Result<RuntimeHandle, BootstrapError> {
        let pending = {
            let mut state = self.inner.lock_state();
            match &*state {
                InitializationState::Ready(handle) => return Ok(handle.clone()),
                InitializationState::Initializing { pending, .. } => pending.clone(),
                InitializationState::Failed(err) if !self.inner.plan.auto_retry => {
                    return Err(err.clone());
                }
                InitializationState::Uninitialized | InitializationState::Failed(_) => {
                    let generation = self.inner.generations.fetch_add(1, Ordering::SeqCst) + 1;
                    let pending = self.bootstrap(generation);
                    *state = InitializationState::Initializing { generation, pending: pending.clone() };
                    pending
                }
            }
        };
        pending.await
    }

    /// Clear a failed bootstrap and try again.
    pub async fn retry(&self) -> Result<RuntimeHandle, BootstrapError> {
        {
            let mut state = self.inner.lock_state();
            if matches!(*state, InitializationState::Failed(_)) {
                tracing::info!("retrying interpreter bootstrap");
                *state = InitializationState::Uninitialized;
            }
        }
        self.acquire().await
    }

    /// Drop the current engine so the next acquisition bootstraps a fresh one.
    ///
    /// An in-flight bootstrap is left alone.
    pub async fn reset(&self) {
        let previous = {
            let mut state = self.inner.lock_state();
            match &*state {
                InitializationState::Ready(_) | InitializationState::Failed(_) => {
                    std::mem::replace(&mut *state, InitializationState::Uninitialized)
                }
                _ => return,
            }
        };
        if let InitializationState::Ready(handle) = previous {
            tracing::warn!(generation = handle.generation, "terminating interpreter");
            handle.engine.terminate().await;
        }
    }

    /// Terminate the engine at process teardown.
    pub async fn shutdown(&self) {
        self.reset().await;
    }

    fn bootstrap(&self, generation: u64) -> PendingBootstrap {
        let launcher = Arc::clone(&self.inner.launcher);
        let plan = self.inner.plan.clone();
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);

        async move {
            let started = Instant::now();
            tracing::info!(generation, "bootstrapping interpreter");
            let outcome = match plan.timeout {
                Some(limit) => tokio::time::timeout(limit, run_bootstrap(launcher.as_ref(), &plan, generation))
                    .await
                    .unwrap_or(Err(BootstrapError::TimedOut(limit))),
                None => run_bootstrap(launcher.as_ref(), &plan, generation).await,
            };
            match &outcome {
                Ok(handle) => tracing::info!(
                    generation,
                    engine = %handle.engine.describe(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "interpreter ready"
                ),
                Err(err) => tracing::error!(generation, error = %err, "interpreter bootstrap failed"),
            }
            if let Some(inner) = inner.upgrade() {
                if !inner.settle(generation, &outcome) {
                    tracing::debug!(generation, "bootstrap outcome superseded");
                }
            }
            outcome
        }
        .boxed()
        .shared()
    }
}

async fn run_bootstrap(
    launcher: &dyn EngineLauncher,
    plan: &BootstrapPlan,
    generation: u64,
) -> Result<RuntimeHandle, BootstrapError> {
    let engine = launcher.launch().await?;
    match provision(engine.as_ref(), plan).await {
        Ok(packages) => Ok(RuntimeHandle { engine, packages: packages.into(), generation }),
        Err(err) => {
            engine.terminate().await;
            Err(err.into())
        }
    }
}

async fn provision(engine: &dyn Engine, plan: &BootstrapPlan) -> Result<Vec<String>, EngineError> {
    let mut provisioned = Vec::new();
    if let Some(manager) = &plan.package_manager {
        tracing::debug!(package = %manager, "loading package manager");
        engine.load_package(manager).await?;
    }
    for name in &plan.preload {
        tracing::debug!(package = %name, "loading package");
        engine.load_package(name).await?;
        provisioned.push(name.clone());
    }
    for name in &plan.install {
        tracing::debug!(package = %name, "installing package");
        engine.install_package(name).await?;
        provisioned.push(name.clone());
    }
    Ok(provisioned)
}
