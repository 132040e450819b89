// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually starting the external commands
//! (download clients, captioning scripts, the trainer) with
//! `tokio::process::Command`, and for tracking them so they can be torn
//! down on interrupt.
//!
//! - [`spawn`] launches background tasks with output redirected to a log
//!   sink, and foreground tasks attached to the terminal.
//! - [`handle`] holds the shared [`TaskHandle`] used for liveness checks and
//!   termination.
//! - [`registry`] provides the [`TaskRegistry`] drained on interrupt.

pub mod handle;
pub mod registry;
pub mod spawn;

pub use handle::{exit_code, SignalScope, TaskHandle};
pub use registry::TaskRegistry;
pub use spawn::{
    argv_command, shell_command, spawn_background, spawn_background_command, spawn_foreground,
    wait_for_exit,
};
