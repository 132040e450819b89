// src/engine/shutdown.rs

use std::future::{self, Future};
use std::time::Duration;

use tracing::{error, warn};

use crate::errors::{Result, TrainwatchError};
use crate::exec::TaskRegistry;

/// How long interrupted tasks get to exit on SIGTERM before SIGKILL.
pub const KILL_GRACE: Duration = Duration::from_secs(3);

/// Resolve when SIGINT (Ctrl-C) or, on unix, SIGTERM arrives.
///
/// If the handlers cannot be installed this never resolves; the run goes
/// on without interrupt teardown.
pub async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                return ctrl_c().await;
            }
        };

        tokio::select! {
            name = ctrl_c() => name,
            _ = term.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await
    }
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C");
        future::pending::<()>().await;
    }
    "SIGINT"
}

/// Drive `work` to completion unless `interrupt` resolves first.
///
/// On interrupt every task in `registry` is sent SIGTERM, anything still
/// alive after [`KILL_GRACE`] gets SIGKILL, and
/// `TrainwatchError::Interrupted` is returned. `work` is dropped, which
/// also drops any relay or watcher it owned.
pub async fn run_until_interrupted<W, I, T>(work: W, interrupt: I, registry: &TaskRegistry) -> Result<T>
where
    W: Future<Output = Result<T>>,
    I: Future<Output = &'static str>,
{
    tokio::select! {
        res = work => res,
        signal = interrupt => {
            warn!(signal, registered = registry.len(), "interrupt received; terminating background tasks");
            registry.shutdown(KILL_GRACE).await;
            Err(TrainwatchError::Interrupted)
        }
    }
}
