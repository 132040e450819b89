// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;
use crate::types::TieBreak;

/// Command-line arguments for `trainwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "trainwatch",
    version,
    about = "Supervise download, captioning and training processes for LoRA fine-tuning runs.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TRAINWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run every phase described by the config file.
    Run {
        /// Path to the config file (TOML).
        #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
        config: PathBuf,

        /// Parse + validate, print the phase plan, but don't execute anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a single command in the background and supervise it.
    Supervise {
        /// Label used in log output and failure messages.
        #[arg(long, default_value = "task")]
        label: String,

        /// File the command's stdout and stderr are redirected to.
        #[arg(long, value_name = "PATH")]
        log: PathBuf,

        /// Maximum wall-clock duration (e.g. "90s", "2h").
        #[arg(long, default_value = "1h")]
        timeout: String,

        /// Regex that fails the task when it appears in the recent log.
        #[arg(long, value_name = "REGEX")]
        error_pattern: Option<String>,

        /// Regex that completes the task when it matches the last log line.
        #[arg(long, value_name = "REGEX")]
        success_pattern: Option<String>,

        /// How often to check the log and the process.
        #[arg(long, default_value = "3s")]
        poll_interval: String,

        /// Which marker wins when both patterns match ("success" or "error").
        #[arg(long, default_value = "success")]
        tie_break: TieBreak,

        /// The command to run.
        #[arg(trailing_var_arg = true, required = true, value_name = "CMD")]
        cmd: Vec<String>,
    },

    /// Publish checkpoints once, without watching.
    Sweep {
        /// Directory the trainer writes epoch directories into.
        #[arg(long, value_name = "DIR")]
        output_root: PathBuf,

        /// Name used for the published copies (`<run_name>_<epoch>.<ext>`).
        #[arg(long)]
        run_name: String,

        /// File name inside each epoch directory.
        #[arg(long, default_value = "adapter_model.safetensors")]
        artifact: String,

        /// Also collect the published files into `<run_name>_checkpoints/`.
        #[arg(long)]
        archive: bool,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
