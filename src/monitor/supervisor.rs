// src/monitor/supervisor.rs

use std::fs::OpenOptions;
use std::path::Path;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::exit_code;
use crate::poll::{Poller, Tick};

use super::relay::LogRelay;
use super::tail::read_window_lossy;
use super::{Detection, FailureReason, Outcome, SupervisedTask};

/// Polling policy for the Process Monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    /// How often liveness and patterns are checked.
    pub poll_interval: Duration,
    /// How often the log relay looks for new output.
    pub relay_interval: Duration,
    /// Number of trailing log lines scanned for the error pattern.
    pub window_lines: usize,
    /// How long a terminated task gets to exit on SIGTERM before SIGKILL.
    pub kill_grace: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            relay_interval: Duration::from_millis(250),
            window_lines: 50,
            kill_grace: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Monitor {
    options: MonitorOptions,
}

impl Monitor {
    pub fn new(options: MonitorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MonitorOptions {
        &self.options
    }

    /// Supervise `task`, relaying its log to stdout.
    pub async fn supervise(&self, task: SupervisedTask) -> Result<Outcome> {
        self.supervise_into(task, tokio::io::stdout()).await
    }

    /// Supervise `task`, relaying its log to `sink`.
    ///
    /// The relay is stopped and joined on every return path, including
    /// errors from the liveness check.
    pub async fn supervise_into<W>(&self, task: SupervisedTask, sink: W) -> Result<Outcome>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        ensure_log_sink(&task.log);
        info!(
            label = %task.label,
            pid = ?task.handle.pid(),
            log = ?task.log,
            max_duration = ?task.max_duration,
            "supervising task"
        );

        let relay = LogRelay::spawn(task.log.clone(), sink, self.options.relay_interval);
        let outcome = self.poll_until_outcome(&task).await;
        relay.stop().await;

        match &outcome {
            Ok(o) if o.is_success() => info!(label = %task.label, outcome = ?o, "task finished"),
            Ok(o) => warn!(label = %task.label, outcome = ?o, log = ?task.log, "task failed"),
            Err(e) => warn!(label = %task.label, error = %e, "supervision aborted"),
        }
        outcome
    }

    async fn poll_until_outcome(&self, task: &SupervisedTask) -> Result<Outcome> {
        let mut poller = Poller::new(self.options.poll_interval).with_deadline(task.max_duration);

        loop {
            let tick = poller.tick().await;

            // Also runs at the deadline, so a task that finished or printed
            // its marker since the previous poll is not reported as timed out.
            if let Some(outcome) = self.check(task).await? {
                debug!(label = %task.label, elapsed = ?poller.elapsed(), "outcome decided");
                return Ok(outcome);
            }

            if tick == Tick::DeadlineReached {
                task.handle.shutdown(self.options.kill_grace).await;
                return Ok(Outcome::Failure(FailureReason::Timeout {
                    after: task.max_duration,
                }));
            }
        }
    }

    /// One poll: detection over the recent window, then liveness.
    async fn check(&self, task: &SupervisedTask) -> Result<Option<Outcome>> {
        let window = read_window_lossy(&task.log, self.options.window_lines);
        match task.detector.evaluate(&window) {
            Detection::Success => {
                debug!(label = %task.label, "success marker seen; not waiting for exit");
                return Ok(Some(Outcome::EarlySuccess));
            }
            Detection::Error { line } => {
                task.handle.shutdown(self.options.kill_grace).await;
                return Ok(Some(Outcome::Failure(FailureReason::ErrorPatternMatched { line })));
            }
            Detection::Nothing => {}
        }

        let Some(status) = task.handle.try_exit()? else {
            return Ok(None);
        };
        let code = exit_code(&status);
        debug!(label = %task.label, exit_code = code, "task exited");

        // Output written between the last read and the exit still counts.
        let window = read_window_lossy(&task.log, self.options.window_lines);
        if let Detection::Error { line } = task.detector.evaluate(&window) {
            // Children the shell left behind go down with it.
            task.handle.shutdown(self.options.kill_grace).await;
            return Ok(Some(Outcome::Failure(FailureReason::ErrorPatternMatched { line })));
        }

        Ok(Some(if status.success() {
            Outcome::Success(code)
        } else {
            Outcome::Failure(FailureReason::NonZeroExit(code))
        }))
    }
}

/// Create the log sink if it doesn't exist yet. Failure only costs log
/// visibility, so it is logged and otherwise ignored.
fn ensure_log_sink(log: &Path) {
    if log.exists() {
        return;
    }
    if let Some(parent) = log.parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
    if let Err(e) = OpenOptions::new().create(true).append(true).open(log) {
        debug!(log = ?log, error = %e, "could not create log sink; relay disabled");
    }
}
