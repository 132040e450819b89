// src/monitor/mod.rs

//! Process Monitor.
//!
//! Given a running background task and its log sink, block until there is a
//! definitive [`Outcome`] while relaying the log to stdout.
//!
//! - [`detect`] holds the pure detection policy (predicates over the recent
//!   log window plus a tie-break).
//! - [`tail`] reads the bounded window from the end of a log.
//! - [`relay`] streams the log to a writer while the task runs.
//! - [`supervisor`] ties them to the task's liveness and deadline.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::exec::TaskHandle;

pub mod detect;
pub mod relay;
pub mod supervisor;
pub mod tail;

pub use detect::{AnyLineMatches, Detection, Detector, LastLineMatches, LogPredicate, LogWindow};
pub use relay::LogRelay;
pub use supervisor::{Monitor, MonitorOptions};

/// Final result of supervising one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The process exited on its own with status 0.
    Success(i32),
    /// The success marker appeared; the process may still be winding down.
    EarlySuccess,
    Failure(FailureReason),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failure(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    ErrorPatternMatched { line: String },
    Timeout { after: Duration },
    NonZeroExit(i32),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ErrorPatternMatched { line } => {
                write!(f, "error detected in log: {line}")
            }
            FailureReason::Timeout { after } => write!(f, "timed out after {after:?}"),
            FailureReason::NonZeroExit(code) => write!(f, "exited with status {code}"),
        }
    }
}

/// One background task under supervision.
///
/// Owned by the `supervise` call it is passed to and dropped with it.
#[derive(Debug)]
pub struct SupervisedTask {
    pub handle: TaskHandle,
    pub log: PathBuf,
    pub label: String,
    pub max_duration: Duration,
    pub detector: Detector,
}

impl SupervisedTask {
    pub fn new(handle: TaskHandle, log: impl Into<PathBuf>, max_duration: Duration) -> Self {
        let label = handle.label().to_string();
        Self {
            handle,
            log: log.into(),
            label,
            max_duration,
            detector: Detector::new(),
        }
    }

    pub fn with_detector(mut self, detector: Detector) -> Self {
        self.detector = detector;
        self
    }
}
