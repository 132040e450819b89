// src/checkpoint/mod.rs

//! Checkpoint publishing.
//!
//! The trainer writes `<output_root>/<run-subdir>/epoch<N>/<artifact>`; we
//! publish stable copies at `<output_root>/<run_name>_<N>.<ext>`.
//!
//! - [`sweep`] does one scan-and-copy pass.
//! - [`watcher`] repeats sweeps in the background until stopped.
//! - [`archive`] gathers the published files into one directory with a
//!   manifest once training is over.

use std::path::{Path, PathBuf};

pub mod archive;
pub mod sweep;
pub mod watcher;

pub use archive::{archive, compute_file_hash, ARCHIVE_MANIFEST};
pub use sweep::{final_sweep, Sweeper};
pub use watcher::CheckpointWatcher;

/// Where to look for checkpoints and how to name the published copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    pub output_root: PathBuf,
    pub run_name: String,
    /// File name the trainer writes inside each epoch directory.
    pub artifact: String,
}

impl SweepPlan {
    pub fn new(
        output_root: impl Into<PathBuf>,
        run_name: impl Into<String>,
        artifact: impl Into<String>,
    ) -> Self {
        Self {
            output_root: output_root.into(),
            run_name: run_name.into(),
            artifact: artifact.into(),
        }
    }

    fn extension(&self) -> Option<&str> {
        Path::new(&self.artifact).extension().and_then(|e| e.to_str())
    }

    /// Published file name for `epoch`, e.g. `mylora_3.safetensors`.
    pub fn destination_name(&self, epoch: u32) -> String {
        match self.extension() {
            Some(ext) => format!("{}_{}.{}", self.run_name, epoch, ext),
            None => format!("{}_{}", self.run_name, epoch),
        }
    }

    pub fn destination(&self, epoch: u32) -> PathBuf {
        self.output_root.join(self.destination_name(epoch))
    }

    /// Inverse of [`destination_name`](Self::destination_name).
    pub fn parse_destination_name(&self, name: &str) -> Option<u32> {
        let rest = name.strip_prefix(self.run_name.as_str())?.strip_prefix('_')?;
        let digits = match self.extension() {
            Some(ext) => rest.strip_suffix(ext)?.strip_suffix('.')?,
            None => rest,
        };
        parse_digits(digits)
    }

    /// Directory the archive step collects published files into.
    pub fn archive_dir(&self) -> PathBuf {
        self.output_root
            .join(format!("{}_checkpoints", self.run_name))
    }
}

/// One published checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointArtifact {
    pub epoch: u32,
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Epoch number from a directory name like `epoch12`.
pub fn parse_epoch_dir(name: &str) -> Option<u32> {
    parse_digits(name.strip_prefix("epoch")?)
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
