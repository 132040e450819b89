// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::monitor::FailureReason;

#[derive(Error, Debug)]
pub enum TrainwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("{label} failed: {reason}{}", log_hint(.log))]
    TaskFailed {
        label: String,
        reason: FailureReason,
        log: Option<PathBuf>,
    },

    #[error("interrupted by signal; background tasks terminated")]
    Interrupted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrainwatchError {
    /// Process exit status used by `main` for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            TrainwatchError::Interrupted => 130,
            _ => 1,
        }
    }
}

fn log_hint(log: &Option<PathBuf>) -> String {
    match log {
        Some(path) => format!(" (see log: {})", path.display()),
        None => String::new(),
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TrainwatchError>;
