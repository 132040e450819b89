// src/checkpoint/watcher.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::fs::FileSystem;
use crate::poll::{Poller, Tick};

use super::Sweeper;

/// Background loop that sweeps for new checkpoints every `interval`.
///
/// Cancellation is cooperative: a sweep that is already copying finishes
/// first, so [`stop`](Self::stop) can take up to one interval plus one copy.
pub struct CheckpointWatcher {
    cancel: CancellationToken,
    handle: JoinHandle<usize>,
}

impl std::fmt::Debug for CheckpointWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointWatcher")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl CheckpointWatcher {
    pub fn spawn(fs: Arc<dyn FileSystem>, sweeper: Sweeper, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            info!(root = ?sweeper.plan().output_root, ?interval, "checkpoint watcher started");
            let mut poller = Poller::new(interval).with_cancel(token);
            let mut sweeper = Some(sweeper);
            let mut published = 0usize;

            while poller.tick().await == Tick::Due {
                let Some(mut current) = sweeper.take() else {
                    break;
                };
                let fs = Arc::clone(&fs);

                // Copies are plain blocking IO; keep them off the async workers.
                let joined = tokio::task::spawn_blocking(move || {
                    let result = current.sweep(fs.as_ref());
                    (current, result)
                })
                .await;

                match joined {
                    Ok((current, result)) => {
                        match result {
                            Ok(artifacts) => published += artifacts.len(),
                            Err(e) => warn!(error = %e, "checkpoint sweep failed"),
                        }
                        sweeper = Some(current);
                    }
                    Err(e) => {
                        warn!(error = %e, "checkpoint sweep panicked; watcher stopping");
                        break;
                    }
                }
            }

            debug!(published, "checkpoint watcher stopped");
            published
        });

        Self { cancel, handle }
    }

    /// Signal the loop to stop and wait for it. Returns the number of
    /// checkpoints the watcher published.
    pub async fn stop(self) -> usize {
        self.cancel.cancel();
        match self.handle.await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "checkpoint watcher task ended abnormally");
                0
            }
        }
    }
}
