#![allow(unused_imports, dead_code)]

pub use trainwatch_test_utils::{builders, fast_monitor_options, init_tracing, with_timeout};

use std::path::Path;
use std::time::{Duration, Instant};

/// Poll `cond` every 20ms until it holds or `limit` passes.
pub async fn eventually<F>(limit: Duration, mut cond: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < limit {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}

/// Shell-quote a path for embedding in `sh -c` commands.
pub fn sh_path(path: &Path) -> String {
    format!("'{}'", path.display())
}

/// Whether nothing is appending to `log` any more: its size is unchanged
/// across half a second, after a short settle.
pub async fn log_stops_growing(log: &Path) -> std::io::Result<bool> {
    tokio::time::sleep(Duration::from_millis(300)).await;
    let before = std::fs::metadata(log)?.len();
    tokio::time::sleep(Duration::from_millis(500)).await;
    Ok(std::fs::metadata(log)?.len() == before)
}

/// Shell snippet that forks a ticking loop and waits on it, so the shell
/// itself is not the process doing the work.
pub const FORKED_TICKER: &str = "while true; do echo tick; sleep 0.05; done & wait";
