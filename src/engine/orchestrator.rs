// src/engine/orchestrator.rs

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{info, warn};

use crate::checkpoint::{self, CheckpointWatcher, SweepPlan, Sweeper};
use crate::config::{ConfigFile, TaskSpec, TrainingSpec};
use crate::errors::{Result, TrainwatchError};
use crate::exec::{self, exit_code, TaskRegistry};
use crate::fs::{FileSystem, RealFileSystem};
use crate::monitor::{FailureReason, Monitor, Outcome, SupervisedTask};
use crate::preflight;

use super::{PhaseReport, RunSummary, TrainingReport};

const TRAINING_LABEL: &str = "training";

/// Drives the configured phases to completion, failing fast.
pub struct Orchestrator {
    config: ConfigFile,
    monitor: Monitor,
    registry: TaskRegistry,
    fs: Arc<dyn FileSystem>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("tasks", &self.config.tasks.len())
            .field("training", &self.config.training.is_some())
            .field("registered", &self.registry.len())
            .finish()
    }
}

impl Orchestrator {
    pub fn new(config: ConfigFile, registry: TaskRegistry) -> Self {
        let monitor = Monitor::new(config.settings.monitor_options());
        Self {
            config,
            monitor,
            registry,
            fs: Arc::new(RealFileSystem),
        }
    }

    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        if let Some(dataset) = &self.config.dataset {
            preflight::check_dataset(self.fs.as_ref(), dataset)?;
        }

        for spec in &self.config.tasks {
            let outcome = self.run_task(spec).await?;
            summary.phases.push(PhaseReport {
                label: spec.label.clone(),
                outcome,
            });
        }

        if let Some(training) = &self.config.training {
            summary.training = Some(self.run_training(training).await?);
        }

        info!(phases = summary.phases.len(), "all phases completed");
        Ok(summary)
    }

    /// Spawn one background task and supervise it to a definitive outcome.
    async fn run_task(&self, spec: &TaskSpec) -> Result<Outcome> {
        let handle = exec::spawn_background(&spec.label, &spec.cmd, &spec.log, &self.registry)?;
        let task = SupervisedTask::new(handle, &spec.log, spec.timeout)
            .with_detector(spec.detector(self.config.settings.tie_break));

        match self.monitor.supervise(task).await? {
            Outcome::Failure(reason) => Err(TrainwatchError::TaskFailed {
                label: spec.label.clone(),
                reason,
                log: Some(spec.log.clone()),
            }),
            outcome => Ok(outcome),
        }
    }

    /// Run the trainer in the foreground with the watcher alongside it.
    ///
    /// The final sweep runs even if the trainer failed, so checkpoints it
    /// managed to write are still published.
    async fn run_training(&self, spec: &TrainingSpec) -> Result<TrainingReport> {
        let settings = &self.config.settings;
        let sweeper = if settings.settle {
            Sweeper::settling(spec.plan.clone())
        } else {
            Sweeper::new(spec.plan.clone())
        };
        let watcher = CheckpointWatcher::spawn(Arc::clone(&self.fs), sweeper, settings.watch_interval);

        let status = match exec::spawn_foreground(TRAINING_LABEL, &spec.cmd, &self.registry) {
            Ok(handle) => exec::wait_for_exit(&handle, settings.poll_interval).await,
            Err(e) => Err(e),
        };

        let watched = watcher.stop().await;
        let status = status?;
        let swept = self.final_sweep(&spec.plan).await?;
        let code = exit_code(&status);

        if !status.success() {
            return Err(TrainwatchError::TaskFailed {
                label: TRAINING_LABEL.to_string(),
                reason: FailureReason::NonZeroExit(code),
                log: None,
            });
        }

        let archive = if spec.archive {
            Some(checkpoint::archive(self.fs.as_ref(), &spec.plan)?)
        } else {
            None
        };

        info!(
            exit_code = code,
            watched,
            final_sweep = swept,
            "training finished"
        );
        Ok(TrainingReport {
            exit_code: code,
            watched,
            final_sweep: swept,
            archive,
        })
    }

    async fn final_sweep(&self, plan: &SweepPlan) -> Result<usize> {
        let fs = Arc::clone(&self.fs);
        let plan = plan.clone();
        let joined = tokio::task::spawn_blocking(move || checkpoint::final_sweep(fs.as_ref(), &plan))
            .await
            .map_err(anyhow::Error::from)?;
        let published = joined?;
        if !published.is_empty() {
            warn!(count = published.len(), "final sweep picked up late checkpoints");
        }
        Ok(published.len())
    }
}

/// Human-readable phase plan for `--dry-run`.
pub fn describe_plan(cfg: &ConfigFile) -> String {
    let s = &cfg.settings;
    let mut out = String::new();

    let _ = writeln!(out, "trainwatch dry-run");
    let _ = writeln!(out, "  poll_interval = {:?}", s.poll_interval);
    let _ = writeln!(out, "  watch_interval = {:?}", s.watch_interval);
    let _ = writeln!(out, "  kill_grace = {:?}", s.kill_grace);
    let _ = writeln!(out, "  window_lines = {}", s.window_lines);
    let _ = writeln!(out, "  tie_break = {:?}", s.tie_break);
    let _ = writeln!(out, "  settle = {}", s.settle);
    let _ = writeln!(out);

    if let Some(ds) = &cfg.dataset {
        let _ = writeln!(out, "dataset: {:?} (require_captions = {})", ds.path, ds.require_captions);
    }

    let _ = writeln!(out, "tasks ({}):", cfg.tasks.len());
    for (i, task) in cfg.tasks.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, task.label);
        let _ = writeln!(out, "      cmd: {}", task.cmd);
        let _ = writeln!(out, "      log: {:?}", task.log);
        let _ = writeln!(out, "      timeout: {:?}", task.timeout);
        if let Some(re) = &task.error_pattern {
            let _ = writeln!(out, "      error_pattern: {}", re.as_str());
        }
        if let Some(re) = &task.success_pattern {
            let _ = writeln!(out, "      success_pattern: {}", re.as_str());
        }
    }

    if let Some(training) = &cfg.training {
        let plan = &training.plan;
        let _ = writeln!(out, "training:");
        let _ = writeln!(out, "      cmd: {}", training.cmd);
        let _ = writeln!(out, "      output_root: {:?}", plan.output_root);
        let _ = writeln!(out, "      artifact: {}", plan.artifact);
        let _ = writeln!(
            out,
            "      publishes: {}",
            plan.output_root
                .join(plan.destination_name(0).replacen("_0", "_<epoch>", 1))
                .display()
        );
        if training.archive {
            let _ = writeln!(out, "      archive: {:?}", plan.archive_dir());
        }
    }

    out
}
