// src/poll.rs

//! Cancellable periodic polling.
//!
//! Both the Process Monitor and the Checkpoint Watcher are "check something,
//! sleep, repeat" loops. [`Poller`] owns the sleep part so that cancellation
//! and deadlines are explicit values instead of conditions buried in loop
//! headers.

use std::future;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Longest supported poll period; larger ones are clamped.
const MAX_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Result of waiting for the next poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The interval elapsed; run one poll.
    Due,
    /// The cancellation token fired.
    Cancelled,
    /// The deadline passed before (or instead of) the next poll.
    DeadlineReached,
}

#[derive(Debug)]
pub struct Poller {
    interval: Interval,
    cancel: CancellationToken,
    started: Instant,
    deadline: Option<Instant>,
}

impl Poller {
    /// A poller that fires immediately and then every `period`.
    pub fn new(period: Duration) -> Self {
        let period = period.clamp(Duration::from_millis(1), MAX_PERIOD);
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            interval,
            cancel: CancellationToken::new(),
            started: Instant::now(),
            deadline: None,
        }
    }

    /// Stop yielding `Due` once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Yield `DeadlineReached` once `limit` has elapsed since construction.
    ///
    /// A limit too far out to represent as an instant means no deadline.
    pub fn with_deadline(mut self, limit: Duration) -> Self {
        self.deadline = self.started.checked_add(limit);
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub async fn tick(&mut self) -> Tick {
        if self.cancel.is_cancelled() {
            return Tick::Cancelled;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Tick::DeadlineReached;
            }
        }

        let deadline = self.deadline;
        let reached = async move {
            match deadline {
                Some(at) => time::sleep_until(at).await,
                None => future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Tick::Cancelled,
            _ = reached => Tick::DeadlineReached,
            _ = self.interval.tick() => Tick::Due,
        }
    }
}
