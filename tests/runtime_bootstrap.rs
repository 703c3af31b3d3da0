mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::FakeLauncher;
use pycourse::config::Config;
use pycourse::runtime::{BootstrapError, BootstrapPlan, RuntimeManager, RuntimeStatus};

fn plan() -> BootstrapPlan {
    BootstrapPlan {
        package_manager: Some("pip".into()),
        preload: vec!["pandas".into()],
        install: vec!["openpyxl".into()],
        timeout: Some(Duration::from_secs(5)),
        auto_retry: false,
    }
}

#[tokio::test]
async fn concurrent_acquisitions_share_one_bootstrap() -> Result<()> {
    let launcher = FakeLauncher::with_delay(Duration::from_millis(100));
    let manager = RuntimeManager::new(launcher.clone(), plan());
    assert_eq!(manager.status(), RuntimeStatus::Uninitialized);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move { manager.acquire().await }));
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(manager.status(), RuntimeStatus::Loading);

    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await??);
    }
    assert_eq!(launcher.launch_count(), 1);
    assert!(handles.windows(2).all(|w| w[0].same_engine(&w[1])));
    assert_eq!(manager.status(), RuntimeStatus::Ready);

    // later callers get the same engine without another launch
    let again = manager.acquire().await?;
    assert!(again.same_engine(&handles[0]));
    assert_eq!(launcher.launch_count(), 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_acquisitions_share_one_failure() -> Result<()> {
    let launcher = FakeLauncher::with_delay(Duration::from_millis(100));
    launcher.set_failing(true);
    let manager = RuntimeManager::new(launcher.clone(), plan());

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move { manager.acquire().await }));
    }
    for task in tasks {
        let err = task.await?.unwrap_err();
        assert!(matches!(err, BootstrapError::Engine(_)), "{}", err);
    }
    assert_eq!(launcher.launch_count(), 1);
    assert!(matches!(manager.status(), RuntimeStatus::Failed(_)));
    Ok(())
}

#[tokio::test]
async fn bootstrap_provisions_in_order() -> Result<()> {
    let launcher = FakeLauncher::new();
    let manager = RuntimeManager::new(launcher.clone(), plan());

    let handle = manager.acquire().await?;
    let engine = launcher.engine(0);
    assert_eq!(*engine.loaded.lock().unwrap(), vec!["pip".to_string(), "pandas".to_string()]);
    assert_eq!(*engine.installed.lock().unwrap(), vec!["openpyxl".to_string()]);
    assert_eq!(handle.packages(), ["pandas".to_string(), "openpyxl".to_string()]);
    assert_eq!(handle.generation(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_bootstrap_is_sticky_until_retry() -> Result<()> {
    let launcher = FakeLauncher::new();
    launcher.set_failing(true);
    let manager = RuntimeManager::new(launcher.clone(), plan());

    let err = manager.acquire().await.unwrap_err();
    assert!(matches!(err, BootstrapError::Engine(_)));
    assert!(matches!(manager.status(), RuntimeStatus::Failed(_)));

    // no new attempt without an explicit retry
    assert!(manager.acquire().await.is_err());
    assert_eq!(launcher.launch_count(), 1);

    launcher.set_failing(false);
    let handle = manager.retry().await?;
    assert_eq!(launcher.launch_count(), 2);
    assert_eq!(handle.generation(), 2);
    assert_eq!(manager.status(), RuntimeStatus::Ready);
    Ok(())
}

#[tokio::test]
async fn auto_retry_relaunches_after_failure() -> Result<()> {
    let launcher = FakeLauncher::new();
    launcher.set_failing(true);
    let manager = RuntimeManager::new(launcher.clone(), BootstrapPlan { auto_retry: true, ..plan() });

    assert!(manager.acquire().await.is_err());
    launcher.set_failing(false);
    manager.acquire().await?;
    assert_eq!(launcher.launch_count(), 2);
    Ok(())
}

#[tokio::test]
async fn package_failure_terminates_the_engine() -> Result<()> {
    let launcher = FakeLauncher::new();
    launcher.fail_package("openpyxl");
    let manager = RuntimeManager::new(launcher.clone(), plan());

    let err = manager.acquire().await.unwrap_err();
    assert!(err.to_string().contains("openpyxl"), "{}", err);
    assert!(launcher.engine(0).is_terminated());
    Ok(())
}

#[tokio::test]
async fn bootstrap_timeout_is_reported() -> Result<()> {
    let launcher = FakeLauncher::with_delay(Duration::from_millis(500));
    let plan = BootstrapPlan { timeout: Some(Duration::from_millis(50)), ..plan() };
    let manager = RuntimeManager::new(launcher, plan);

    let err = manager.acquire().await.unwrap_err();
    assert!(matches!(err, BootstrapError::TimedOut(_)));
    assert!(matches!(manager.status(), RuntimeStatus::Failed(_)));
    Ok(())
}

#[tokio::test]
async fn reset_discards_the_engine() -> Result<()> {
    let launcher = FakeLauncher::new();
    let manager = RuntimeManager::new(launcher.clone(), plan());

    let first = manager.acquire().await?;
    manager.reset().await;
    assert!(launcher.engine(0).is_terminated());
    assert_eq!(manager.status(), RuntimeStatus::Uninitialized);

    let second = manager.acquire().await?;
    assert!(!second.same_engine(&first));
    assert_eq!(second.generation(), 2);
    Ok(())
}

#[tokio::test]
async fn shutdown_is_idempotent() -> Result<()> {
    let launcher = FakeLauncher::new();
    let manager = RuntimeManager::new(launcher.clone(), plan());
    manager.shutdown().await;
    manager.acquire().await?;
    manager.shutdown().await;
    manager.shutdown().await;
    assert!(launcher.engine(0).is_terminated());
    Ok(())
}

#[test]
fn plan_reads_config_lists() {
    let cfg = Config::from_pairs([
        ("PRELOAD_PACKAGES", "pandas, numpy"),
        ("INSTALL_PACKAGES", "none"),
        ("BOOTSTRAP_TIMEOUT", "0"),
        ("AUTO_RETRY_BOOTSTRAP", "true"),
    ]);
    let plan = BootstrapPlan::from_config(&cfg);
    assert_eq!(plan.package_manager.as_deref(), Some("pip"));
    assert_eq!(plan.preload, vec!["pandas".to_string(), "numpy".to_string()]);
    assert!(plan.install.is_empty());
    assert_eq!(plan.timeout, None);
    assert!(plan.auto_retry);
}

#[tokio::test]
async fn handles_outlive_the_manager() -> Result<()> {
    let launcher = FakeLauncher::new();
    let handle = {
        let manager = RuntimeManager::new(launcher.clone(), plan());
        manager.acquire().await?
    };
    let engine = Arc::clone(handle.engine());
    engine.reset_output().await?;
    assert_eq!(engine.drain_output().await?, "");
    Ok(())
}
