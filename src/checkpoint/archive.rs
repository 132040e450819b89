// src/checkpoint/archive.rs

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use blake3::Hasher;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::Result;
use crate::fs::FileSystem;

use super::SweepPlan;

/// Manifest written next to the archived checkpoints.
pub const ARCHIVE_MANIFEST: &str = "manifest.toml";

#[derive(Debug, Serialize)]
struct Manifest {
    run_name: String,
    artifacts: Vec<ManifestEntry>,
}

#[derive(Debug, Serialize)]
struct ManifestEntry {
    epoch: u32,
    file: String,
    bytes: u64,
    blake3: String,
}

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs.open_read(path)?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading {:?} for hashing", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Collect every published checkpoint into [`SweepPlan::archive_dir`] and
/// write a manifest listing epoch, size and blake3 digest for each.
///
/// Files already present in the archive are left as they are.
pub fn archive(fs: &dyn FileSystem, plan: &SweepPlan) -> Result<PathBuf> {
    let dir = plan.archive_dir();

    let mut published: Vec<(u32, PathBuf)> = if fs.is_dir(&plan.output_root) {
        fs.read_dir(&plan.output_root)?
            .into_iter()
            .filter(|p| fs.is_file(p))
            .filter_map(|p| {
                let name = p.file_name()?.to_str()?;
                let epoch = plan.parse_destination_name(name)?;
                Some((epoch, p))
            })
            .collect()
    } else {
        Vec::new()
    };
    published.sort();

    if published.is_empty() {
        warn!(root = ?plan.output_root, run_name = %plan.run_name, "no published checkpoints to archive");
    }

    let mut entries = Vec::with_capacity(published.len());
    for (epoch, path) in published {
        let file = plan.destination_name(epoch);
        fs.publish_copy(&path, &dir.join(&file))?;
        entries.push(ManifestEntry {
            epoch,
            bytes: fs.file_len(&path)?,
            blake3: compute_file_hash(fs, &path)?,
            file,
        });
    }

    let manifest = Manifest {
        run_name: plan.run_name.clone(),
        artifacts: entries,
    };
    let text = toml::to_string(&manifest).context("serialising checkpoint manifest")?;
    fs.write(&dir.join(ARCHIVE_MANIFEST), text.as_bytes())?;

    info!(
        archive = ?dir,
        artifacts = manifest.artifacts.len(),
        "archived checkpoints"
    );
    Ok(dir)
}
