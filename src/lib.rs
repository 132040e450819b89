// src/lib.rs

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod monitor;
pub mod poll;
pub mod preflight;
pub mod types;

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};

use crate::checkpoint::SweepPlan;
use crate::cli::{CliArgs, Command};
use crate::config::load_and_validate;
use crate::engine::{describe_plan, run_until_interrupted, shutdown_signal, Orchestrator};
use crate::errors::{Result, TrainwatchError};
use crate::exec::TaskRegistry;
use crate::fs::RealFileSystem;
use crate::monitor::{Detector, Monitor, MonitorOptions, Outcome, SupervisedTask};
use crate::types::{parse_duration, TieBreak};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the task registry and its interrupt teardown
/// - the orchestrator, or one of the standalone subcommands
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Run { config, dry_run } => run_pipeline(&config, dry_run).await,
        Command::Supervise {
            label,
            log,
            timeout,
            error_pattern,
            success_pattern,
            poll_interval,
            tie_break,
            cmd,
        } => {
            let request = SuperviseRequest {
                label,
                log,
                timeout,
                error_pattern,
                success_pattern,
                poll_interval,
                tie_break,
                cmd,
            };
            supervise_command(request).await
        }
        Command::Sweep {
            output_root,
            run_name,
            artifact,
            archive,
        } => sweep_command(SweepPlan::new(output_root, run_name, artifact), archive).await,
    }
}

async fn run_pipeline(config_path: &Path, dry_run: bool) -> Result<()> {
    let cfg = load_and_validate(config_path)?;

    if dry_run {
        print!("{}", describe_plan(&cfg));
        debug!("dry-run complete (no execution)");
        return Ok(());
    }

    let registry = TaskRegistry::new();
    let orchestrator = Orchestrator::new(cfg, registry.clone());

    let summary = run_until_interrupted(orchestrator.run(), shutdown_signal(), &registry).await?;
    info!(
        phases = summary.phases.len(),
        training = summary.training.is_some(),
        "run complete"
    );
    Ok(())
}

/// Arguments of `trainwatch supervise`, still as raw strings.
#[derive(Debug, Clone)]
struct SuperviseRequest {
    label: String,
    log: PathBuf,
    timeout: String,
    error_pattern: Option<String>,
    success_pattern: Option<String>,
    poll_interval: String,
    tie_break: TieBreak,
    /// One element is a shell snippet, several are program + arguments.
    cmd: Vec<String>,
}

fn cli_duration(flag: &str, value: &str) -> Result<std::time::Duration> {
    match parse_duration(value) {
        Ok(d) if !d.is_zero() => Ok(d),
        Ok(_) => Err(TrainwatchError::ConfigError(format!("--{flag} must be greater than zero"))),
        Err(e) => Err(TrainwatchError::ConfigError(format!("--{flag}: {e}"))),
    }
}

async fn supervise_command(req: SuperviseRequest) -> Result<()> {
    let timeout = cli_duration("timeout", &req.timeout)?;
    let options = MonitorOptions {
        poll_interval: cli_duration("poll-interval", &req.poll_interval)?,
        ..MonitorOptions::default()
    };
    let detector = Detector::from_patterns(
        req.success_pattern.as_deref().map(Regex::new).transpose()?,
        req.error_pattern.as_deref().map(Regex::new).transpose()?,
        req.tie_break,
    );

    let command = exec::argv_command(&req.cmd)?;

    let registry = TaskRegistry::new();
    let work = async {
        let handle = exec::spawn_background_command(&req.label, command, &req.log, &registry)?;
        let task = SupervisedTask::new(handle, &req.log, timeout).with_detector(detector);
        Monitor::new(options).supervise(task).await
    };

    match run_until_interrupted(work, shutdown_signal(), &registry).await? {
        Outcome::Failure(reason) => Err(TrainwatchError::TaskFailed {
            label: req.label,
            reason,
            log: Some(req.log),
        }),
        outcome => {
            info!(label = %req.label, ?outcome, "supervised task succeeded");
            Ok(())
        }
    }
}

async fn sweep_command(plan: SweepPlan, archive: bool) -> Result<()> {
    let joined = tokio::task::spawn_blocking(move || -> Result<()> {
        let fs = RealFileSystem;
        let published = checkpoint::final_sweep(&fs, &plan)?;
        println!(
            "published {} checkpoint(s) under {}",
            published.len(),
            plan.output_root.display()
        );
        if archive {
            let dir = checkpoint::archive(&fs, &plan)?;
            println!("archived to {}", dir.display());
        }
        Ok(())
    })
    .await
    .map_err(anyhow::Error::from)?;
    joined
}
