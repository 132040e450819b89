// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::checkpoint::SweepPlan;
use crate::monitor::{Detector, MonitorOptions};
use crate::types::TieBreak;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// poll_interval = "3s"
/// watch_interval = "30s"
///
/// [dataset]
/// path = "dataset"
///
/// [[task]]
/// label = "model download"
/// cmd = "hf download Wan-AI/Wan2.1-T2V-14B --local-dir models/wan"
/// timeout = "2h"
/// error_pattern = "Error:"
///
/// [training]
/// cmd = "deepspeed --num_gpus=1 train.py --config train.toml"
/// output_root = "output"
/// run_name = "mylora"
/// ```
///
/// `[[task]]` entries run in file order. All sections are optional, but at
/// least one task or a `[training]` section must be present.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub dataset: Option<DatasetSection>,

    #[serde(default)]
    pub task: Vec<TaskConfig>,

    #[serde(default)]
    pub training: Option<TrainingSection>,
}

/// `[config]` section: polling behaviour shared by all phases.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Process Monitor poll interval, e.g. `"3s"`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// How often the log relay checks for new output.
    #[serde(default = "default_relay_interval")]
    pub relay_interval: String,

    /// Checkpoint Watcher poll interval.
    #[serde(default = "default_watch_interval")]
    pub watch_interval: String,

    /// How long a terminated task gets to exit on SIGTERM before SIGKILL.
    #[serde(default = "default_kill_grace")]
    pub kill_grace: String,

    /// Trailing lines scanned for `error_pattern` on each poll.
    #[serde(default = "default_window_lines")]
    pub window_lines: usize,

    /// `"success"` (default) or `"error"`: which marker wins when both match.
    #[serde(default)]
    pub tie_break: TieBreak,

    /// Only copy a checkpoint once its size is stable across two polls.
    #[serde(default = "default_settle")]
    pub settle: bool,
}

fn default_poll_interval() -> String {
    "3s".to_string()
}

fn default_relay_interval() -> String {
    "250ms".to_string()
}

fn default_watch_interval() -> String {
    "30s".to_string()
}

fn default_kill_grace() -> String {
    "5s".to_string()
}

fn default_window_lines() -> usize {
    50
}

fn default_settle() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            relay_interval: default_relay_interval(),
            watch_interval: default_watch_interval(),
            kill_grace: default_kill_grace(),
            window_lines: default_window_lines(),
            tie_break: TieBreak::default(),
            settle: default_settle(),
        }
    }
}

/// `[dataset]` section, checked before any phase runs.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSection {
    pub path: PathBuf,

    /// Fail (instead of warn) when a media file has no `.txt` caption.
    #[serde(default)]
    pub require_captions: bool,
}

/// One `[[task]]` entry: a background command supervised to completion.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Human label used in logs and failure messages.
    pub label: String,

    /// Shell command to run.
    pub cmd: String,

    /// Log sink; defaults to `logs/<label>.log`.
    #[serde(default)]
    pub log: Option<PathBuf>,

    /// Maximum wall-clock duration, e.g. `"2h"`.
    pub timeout: String,

    /// Regex scanned over the recent log window; a match fails the task.
    #[serde(default)]
    pub error_pattern: Option<String>,

    /// Regex matched against the last log line; a match completes the task.
    #[serde(default)]
    pub success_pattern: Option<String>,
}

impl TaskConfig {
    /// Effective log path, deriving one from the label if unset.
    pub fn effective_log(&self) -> PathBuf {
        match &self.log {
            Some(p) => p.clone(),
            None => {
                let slug: String = self
                    .label
                    .trim()
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
                    .collect();
                PathBuf::from("logs").join(format!("{slug}.log"))
            }
        }
    }
}

/// `[training]` section: the foreground trainer and its checkpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingSection {
    pub cmd: String,

    pub output_root: PathBuf,

    pub run_name: String,

    /// File name the trainer writes inside each `epoch<N>` directory.
    #[serde(default = "default_artifact")]
    pub artifact: String,

    /// Collect published checkpoints into `<run_name>_checkpoints/` at the end.
    #[serde(default = "default_archive")]
    pub archive: bool,
}

fn default_artifact() -> String {
    "adapter_model.safetensors".to_string()
}

fn default_archive() -> bool {
    true
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub settings: Settings,
    pub dataset: Option<DatasetSection>,
    pub tasks: Vec<TaskSpec>,
    pub training: Option<TrainingSpec>,
}

/// `[config]` with durations parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub poll_interval: Duration,
    pub relay_interval: Duration,
    pub watch_interval: Duration,
    pub kill_grace: Duration,
    pub window_lines: usize,
    pub tie_break: TieBreak,
    pub settle: bool,
}

impl Settings {
    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            poll_interval: self.poll_interval,
            relay_interval: self.relay_interval,
            window_lines: self.window_lines,
            kill_grace: self.kill_grace,
        }
    }
}

/// A `[[task]]` with its timeout parsed and patterns compiled.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub label: String,
    pub cmd: String,
    pub log: PathBuf,
    pub timeout: Duration,
    pub error_pattern: Option<Regex>,
    pub success_pattern: Option<Regex>,
}

impl TaskSpec {
    pub fn detector(&self, tie_break: TieBreak) -> Detector {
        Detector::from_patterns(
            self.success_pattern.clone(),
            self.error_pattern.clone(),
            tie_break,
        )
    }
}

#[derive(Debug, Clone)]
pub struct TrainingSpec {
    pub cmd: String,
    pub plan: SweepPlan,
    pub archive: bool,
}
