// src/config/validate.rs

use std::collections::HashSet;
use std::time::Duration;

use regex::Regex;

use crate::checkpoint::SweepPlan;
use crate::config::model::{
    ConfigFile, ConfigSection, RawConfigFile, Settings, TaskConfig, TaskSpec, TrainingSection,
    TrainingSpec,
};
use crate::errors::{Result, TrainwatchError};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TrainwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_phases(&raw)?;
        ensure_unique_labels(&raw)?;

        let settings = validate_settings(&raw.config)?;
        let tasks = raw
            .task
            .iter()
            .map(validate_task)
            .collect::<Result<Vec<_>>>()?;
        let training = raw.training.as_ref().map(validate_training).transpose()?;

        Ok(ConfigFile {
            settings,
            dataset: raw.dataset,
            tasks,
            training,
        })
    }
}

fn config_error(msg: impl Into<String>) -> TrainwatchError {
    TrainwatchError::ConfigError(msg.into())
}

fn ensure_has_phases(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() && cfg.training.is_none() {
        return Err(config_error(
            "config must contain at least one [[task]] entry or a [training] section",
        ));
    }
    Ok(())
}

fn ensure_unique_labels(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for task in cfg.task.iter() {
        if !seen.insert(task.label.trim()) {
            return Err(config_error(format!(
                "duplicate task label '{}'",
                task.label.trim()
            )));
        }
    }
    Ok(())
}

fn positive_duration(field: &str, value: &str) -> Result<Duration> {
    let dur = parse_duration(value).map_err(|e| config_error(format!("{field}: {e}")))?;
    if dur.is_zero() {
        return Err(config_error(format!("{field} must be greater than zero")));
    }
    Ok(dur)
}

fn validate_settings(section: &ConfigSection) -> Result<Settings> {
    if section.window_lines == 0 {
        return Err(config_error("[config].window_lines must be >= 1 (got 0)"));
    }

    Ok(Settings {
        poll_interval: positive_duration("[config].poll_interval", &section.poll_interval)?,
        relay_interval: positive_duration("[config].relay_interval", &section.relay_interval)?,
        watch_interval: positive_duration("[config].watch_interval", &section.watch_interval)?,
        kill_grace: positive_duration("[config].kill_grace", &section.kill_grace)?,
        window_lines: section.window_lines,
        tie_break: section.tie_break,
        settle: section.settle,
    })
}

fn compile(label: &str, field: &str, pattern: Option<&String>) -> Result<Option<Regex>> {
    match pattern {
        None => Ok(None),
        Some(p) if p.is_empty() => Err(config_error(format!(
            "task '{label}': {field} must not be empty"
        ))),
        Some(p) => Regex::new(p).map(Some).map_err(|e| {
            config_error(format!("task '{label}': invalid {field} '{p}': {e}"))
        }),
    }
}

fn validate_task(task: &TaskConfig) -> Result<TaskSpec> {
    let label = task.label.trim();
    if label.is_empty() {
        return Err(config_error("every [[task]] needs a non-empty label"));
    }
    if task.cmd.trim().is_empty() {
        return Err(config_error(format!("task '{label}' has an empty cmd")));
    }

    Ok(TaskSpec {
        label: label.to_string(),
        cmd: task.cmd.clone(),
        log: task.effective_log(),
        timeout: positive_duration(&format!("task '{label}' timeout"), &task.timeout)?,
        error_pattern: compile(label, "error_pattern", task.error_pattern.as_ref())?,
        success_pattern: compile(label, "success_pattern", task.success_pattern.as_ref())?,
    })
}

fn validate_training(section: &TrainingSection) -> Result<TrainingSpec> {
    if section.cmd.trim().is_empty() {
        return Err(config_error("[training].cmd must not be empty"));
    }

    let run_name = section.run_name.trim();
    if run_name.is_empty() {
        return Err(config_error("[training].run_name must not be empty"));
    }
    if run_name.contains(['/', '\\']) {
        return Err(config_error(format!(
            "[training].run_name '{run_name}' must not contain a path separator"
        )));
    }

    let has_extension = std::path::Path::new(&section.artifact)
        .extension()
        .is_some_and(|e| !e.is_empty());
    if !has_extension {
        return Err(config_error(format!(
            "[training].artifact '{}' must have a file extension",
            section.artifact
        )));
    }

    Ok(TrainingSpec {
        cmd: section.cmd.clone(),
        plan: SweepPlan::new(&section.output_root, run_name, &section.artifact),
        archive: section.archive,
    })
}
