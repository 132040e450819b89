// tests/checkpoint_watcher.rs

mod common;
use crate::common::{eventually, init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use trainwatch::checkpoint::{final_sweep, CheckpointWatcher, SweepPlan, Sweeper};
use trainwatch::fs::mock::MockFileSystem;
use trainwatch::fs::{FileSystem, RealFileSystem};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn watcher_publishes_checkpoints_as_they_appear() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let plan = SweepPlan::new(dir.path(), "mylora", "adapter_model.safetensors");
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let watcher = CheckpointWatcher::spawn(fs, Sweeper::new(plan.clone()), Duration::from_millis(50));

    for epoch in 1..=2 {
        let epoch_dir = dir.path().join(format!("run1/epoch{epoch}"));
        std::fs::create_dir_all(&epoch_dir)?;
        std::fs::write(epoch_dir.join("adapter_model.safetensors"), format!("w{epoch}"))?;

        let dest = plan.destination(epoch);
        assert!(
            eventually(Duration::from_secs(5), || dest.exists()).await,
            "epoch {epoch} should be published"
        );
    }

    let published = with_timeout(watcher.stop()).await;
    assert_eq!(published, 2);

    // Nothing left for the final sweep.
    assert!(final_sweep(&RealFileSystem, &plan)?.is_empty());
    assert_eq!(std::fs::read_to_string(plan.destination(2))?, "w2");
    Ok(())
}

#[tokio::test]
async fn final_sweep_catches_what_the_stopped_watcher_missed() -> TestResult {
    init_tracing();
    let mock = MockFileSystem::new();
    let plan = SweepPlan::new("output", "late", "adapter_model.safetensors");
    let fs: Arc<dyn FileSystem> = Arc::new(mock.clone());

    // Settling watcher with a long interval: it sees the file at most once
    // and never publishes it.
    let watcher = CheckpointWatcher::spawn(fs, Sweeper::settling(plan.clone()), Duration::from_secs(30));
    tokio::time::sleep(Duration::from_millis(50)).await;
    mock.add_file("output/run1/epoch9/adapter_model.safetensors", b"last");

    assert_eq!(with_timeout(watcher.stop()).await, 0);

    let published = final_sweep(&mock, &plan)?;
    assert_eq!(published.len(), 1);
    assert_eq!(mock.contents("output/late_9.safetensors"), Some(b"last".to_vec()));
    Ok(())
}

#[tokio::test]
async fn stop_returns_promptly_with_a_long_interval() -> TestResult {
    init_tracing();
    let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
    let plan = SweepPlan::new("output", "idle", "adapter_model.safetensors");

    let watcher = CheckpointWatcher::spawn(fs, Sweeper::new(plan), Duration::from_secs(3600));
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(with_timeout(watcher.stop()).await, 0);
    Ok(())
}
