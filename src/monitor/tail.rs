// src/monitor/tail.rs

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use super::detect::LogWindow;

/// Upper bound on how much of the end of a log is read per poll.
pub const MAX_TAIL_BYTES: u64 = 64 * 1024;

/// Read the last `max_lines` lines of `path`.
///
/// At most [`MAX_TAIL_BYTES`] are read from the end of the file; if that cut
/// lands mid-line, the partial first line is discarded.
pub fn read_window(path: &Path, max_lines: usize) -> io::Result<LogWindow> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let start = len.saturating_sub(MAX_TAIL_BYTES);
    file.seek(SeekFrom::Start(start))?;

    let mut buf = Vec::with_capacity((len - start) as usize);
    file.read_to_end(&mut buf)?;
    let text = String::from_utf8_lossy(&buf);

    let text = if start > 0 {
        match text.find('\n') {
            Some(idx) => &text[idx + 1..],
            None => "",
        }
    } else {
        &text[..]
    };

    Ok(LogWindow::from_text(text, max_lines))
}

/// Like [`read_window`], but a missing or unreadable log is just empty.
pub fn read_window_lossy(path: &Path, max_lines: usize) -> LogWindow {
    read_window(path, max_lines).unwrap_or_default()
}
