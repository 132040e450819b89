// src/engine/mod.rs

//! Orchestration engine for trainwatch.
//!
//! Phases run strictly in order:
//! - dataset preflight (optional)
//! - background tasks from `[[task]]`, each supervised to a definitive
//!   outcome before the next one starts
//! - the foreground training process, with the Checkpoint Watcher running
//!   alongside it, followed by a final sweep and the archive
//!
//! Any failure aborts the run. [`shutdown`] wraps the whole thing so that
//! an interrupt terminates every registered task before exiting.

use std::path::PathBuf;

use crate::monitor::Outcome;

pub mod orchestrator;
pub mod shutdown;

pub use orchestrator::{describe_plan, Orchestrator};
pub use shutdown::{run_until_interrupted, shutdown_signal};

/// Result of one `[[task]]` phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub label: String,
    pub outcome: Outcome,
}

/// Result of the training phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingReport {
    pub exit_code: i32,
    /// Checkpoints published by the background watcher.
    pub watched: usize,
    /// Checkpoints only picked up by the final sweep.
    pub final_sweep: usize,
    pub archive: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub phases: Vec<PhaseReport>,
    pub training: Option<TrainingReport>,
}
