// src/preflight.rs

//! Dataset validation before any phase starts.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::DatasetSection;
use crate::errors::{Result, TrainwatchError};
use crate::fs::FileSystem;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv", "avi"];
const CAPTION_EXTENSION: &str = "txt";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSummary {
    pub images: usize,
    pub videos: usize,
    pub captions: usize,
    /// Media files without a same-stem `.txt` caption next to them.
    pub uncaptioned: Vec<PathBuf>,
}

impl DatasetSummary {
    pub fn media(&self) -> usize {
        self.images + self.videos
    }
}

fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Count media and caption files directly inside `dir`.
pub fn summarize_dataset(fs: &dyn FileSystem, dir: &Path) -> Result<DatasetSummary> {
    if !fs.is_dir(dir) {
        return Err(TrainwatchError::ConfigError(format!(
            "dataset directory {:?} does not exist",
            dir
        )));
    }

    let mut entries = fs.read_dir(dir)?;
    entries.sort();

    let mut summary = DatasetSummary::default();
    for path in entries.iter().filter(|p| fs.is_file(p)) {
        let Some(ext) = extension_lower(path) else {
            continue;
        };

        let is_image = IMAGE_EXTENSIONS.contains(&ext.as_str());
        let is_video = VIDEO_EXTENSIONS.contains(&ext.as_str());
        if ext == CAPTION_EXTENSION {
            summary.captions += 1;
        } else if is_image || is_video {
            if is_image {
                summary.images += 1;
            } else {
                summary.videos += 1;
            }
            if !fs.is_file(&path.with_extension(CAPTION_EXTENSION)) {
                summary.uncaptioned.push(path.clone());
            }
        }
    }

    Ok(summary)
}

/// Validate the configured dataset.
///
/// Fails if the directory is missing or holds no media, or if captions are
/// required and some media file lacks one. Missing captions are otherwise
/// only reported.
pub fn check_dataset(fs: &dyn FileSystem, section: &DatasetSection) -> Result<DatasetSummary> {
    let summary = summarize_dataset(fs, &section.path)?;

    if summary.media() == 0 {
        return Err(TrainwatchError::ConfigError(format!(
            "dataset directory {:?} contains no image or video files",
            section.path
        )));
    }

    if !summary.uncaptioned.is_empty() {
        if section.require_captions {
            return Err(TrainwatchError::ConfigError(format!(
                "{} media file(s) in {:?} have no caption, first: {:?}",
                summary.uncaptioned.len(),
                section.path,
                summary.uncaptioned[0]
            )));
        }
        warn!(
            dataset = ?section.path,
            uncaptioned = summary.uncaptioned.len(),
            "some media files have no caption"
        );
    }

    info!(
        dataset = ?section.path,
        images = summary.images,
        videos = summary.videos,
        captions = summary.captions,
        "dataset check passed"
    );
    Ok(summary)
}
