// src/monitor/relay.rs

//! Streams a growing log file to a writer (normally stdout).

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::poll::{Poller, Tick};

const CHUNK: usize = 16 * 1024;

/// A running log relay.
///
/// Log visibility is best-effort: a sink that never appears or cannot be
/// read just means nothing is relayed. [`LogRelay::stop`] must be awaited
/// so the relay task is gone before the caller moves on.
#[derive(Debug)]
pub struct LogRelay<W> {
    cancel: CancellationToken,
    handle: JoinHandle<W>,
}

impl<W> LogRelay<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn spawn(log: impl Into<PathBuf>, sink: W, interval: Duration) -> Self {
        let log = log.into();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut sink = sink;
            let mut offset = 0u64;
            let mut poller = Poller::new(interval).with_cancel(token);

            loop {
                let tick = poller.tick().await;
                // Drain once more after cancellation so the tail isn't lost.
                if let Err(e) = forward_new_bytes(&log, &mut offset, &mut sink).await {
                    debug!(log = ?log, error = %e, "log relay read failed");
                }
                if tick == Tick::Cancelled {
                    break;
                }
            }

            let _ = sink.flush().await;
            debug!(log = ?log, relayed = offset, "log relay stopped");
            sink
        });

        Self { cancel, handle }
    }

    /// Stop relaying and hand the writer back.
    pub async fn stop(self) -> Option<W> {
        self.cancel.cancel();
        match self.handle.await {
            Ok(sink) => Some(sink),
            Err(e) => {
                warn!(error = %e, "log relay task ended abnormally");
                None
            }
        }
    }
}

/// Copy everything past `offset` to `sink`, advancing `offset`.
async fn forward_new_bytes<W>(log: &Path, offset: &mut u64, sink: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut file = match File::open(log).await {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let len = file.metadata().await?.len();
    if len < *offset {
        // Truncated underneath us; start over.
        *offset = 0;
    }
    if len == *offset {
        return Ok(());
    }

    file.seek(SeekFrom::Start(*offset)).await?;
    let mut buf = vec![0u8; CHUNK];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n]).await?;
        *offset += n as u64;
    }
    sink.flush().await
}
