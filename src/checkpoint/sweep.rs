// src/checkpoint/sweep.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::fs::FileSystem;

use super::{parse_epoch_dir, CheckpointArtifact, SweepPlan};

/// A checkpoint file found on disk, not yet published.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    epoch: u32,
    source: PathBuf,
}

/// Runs sweeps for one plan.
///
/// A settling sweeper remembers the size of every unpublished source it has
/// seen and only copies a file once two consecutive sweeps saw the same
/// size. That keeps the background watcher from copying a checkpoint the
/// trainer is still writing. The final sweep runs after the trainer exited
/// and copies unconditionally.
#[derive(Debug, Clone)]
pub struct Sweeper {
    plan: SweepPlan,
    sizes: Option<HashMap<PathBuf, u64>>,
}

impl Sweeper {
    pub fn new(plan: SweepPlan) -> Self {
        Self { plan, sizes: None }
    }

    pub fn settling(plan: SweepPlan) -> Self {
        Self {
            plan,
            sizes: Some(HashMap::new()),
        }
    }

    pub fn plan(&self) -> &SweepPlan {
        &self.plan
    }

    /// One pass: publish every checkpoint whose destination doesn't exist.
    ///
    /// Missing directories are normal (the trainer hasn't written anything
    /// yet) and yield an empty result. Never deletes or modifies a source
    /// and never overwrites a destination.
    pub fn sweep(&mut self, fs: &dyn FileSystem) -> Result<Vec<CheckpointArtifact>> {
        let mut published = Vec::new();

        for candidate in discover(fs, &self.plan) {
            let destination = self.plan.destination(candidate.epoch);
            if fs.exists(&destination) {
                continue;
            }
            if !self.settled(fs, &candidate.source) {
                continue;
            }

            match fs.publish_copy(&candidate.source, &destination) {
                Ok(true) => {
                    info!(
                        epoch = candidate.epoch,
                        source = ?candidate.source,
                        destination = ?destination,
                        "published checkpoint"
                    );
                    if let Some(sizes) = self.sizes.as_mut() {
                        sizes.remove(&candidate.source);
                    }
                    published.push(CheckpointArtifact {
                        epoch: candidate.epoch,
                        source: candidate.source,
                        destination,
                    });
                }
                Ok(false) => {
                    debug!(destination = ?destination, "destination appeared concurrently; skipped");
                }
                Err(e) => {
                    warn!(
                        source = ?candidate.source,
                        destination = ?destination,
                        error = %e,
                        "failed to publish checkpoint; will retry next sweep"
                    );
                }
            }
        }

        Ok(published)
    }

    /// Whether `source` may be copied now. Always true for non-settling
    /// sweepers.
    fn settled(&mut self, fs: &dyn FileSystem, source: &Path) -> bool {
        let Some(sizes) = self.sizes.as_mut() else {
            return true;
        };
        let len = match fs.file_len(source) {
            Ok(len) => len,
            Err(e) => {
                debug!(source = ?source, error = %e, "checkpoint vanished before stat");
                return false;
            }
        };

        match sizes.insert(source.to_path_buf(), len) {
            Some(previous) if previous == len => true,
            _ => {
                debug!(source = ?source, bytes = len, "checkpoint not settled yet");
                false
            }
        }
    }
}

/// One-shot, non-settling sweep.
pub fn final_sweep(fs: &dyn FileSystem, plan: &SweepPlan) -> Result<Vec<CheckpointArtifact>> {
    Sweeper::new(plan.clone()).sweep(fs)
}

/// Find `<root>/<run-subdir>/epochN/<artifact>` files. An `epochN` directory
/// directly under the root is accepted too.
fn discover(fs: &dyn FileSystem, plan: &SweepPlan) -> Vec<Candidate> {
    let mut found = Vec::new();

    for child in sorted_subdirs(fs, &plan.output_root) {
        if let Some(epoch) = dir_epoch(&child) {
            push_if_present(fs, plan, epoch, &child, &mut found);
            continue;
        }
        for grandchild in sorted_subdirs(fs, &child) {
            if let Some(epoch) = dir_epoch(&grandchild) {
                push_if_present(fs, plan, epoch, &grandchild, &mut found);
            }
        }
    }

    found
}

fn push_if_present(
    fs: &dyn FileSystem,
    plan: &SweepPlan,
    epoch: u32,
    dir: &Path,
    found: &mut Vec<Candidate>,
) {
    let source = dir.join(&plan.artifact);
    if fs.is_file(&source) {
        found.push(Candidate { epoch, source });
    }
}

fn dir_epoch(dir: &Path) -> Option<u32> {
    dir.file_name()
        .and_then(|n| n.to_str())
        .and_then(parse_epoch_dir)
}

fn sorted_subdirs(fs: &dyn FileSystem, dir: &Path) -> Vec<PathBuf> {
    if !fs.is_dir(dir) {
        return Vec::new();
    }
    let mut dirs: Vec<PathBuf> = match fs.read_dir(dir) {
        Ok(entries) => entries.into_iter().filter(|p| fs.is_dir(p)).collect(),
        Err(e) => {
            debug!(dir = ?dir, error = %e, "cannot list directory; skipping");
            Vec::new()
        }
    };
    dirs.sort();
    dirs
}
