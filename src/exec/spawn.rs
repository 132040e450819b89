// src/exec/spawn.rs

//! Launching task processes.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{Result, TrainwatchError};
use crate::poll::Poller;

use super::{SignalScope, TaskHandle, TaskRegistry};

/// Build a shell command appropriate for the platform.
pub fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Command for an argv as typed on our own command line.
///
/// A single element is a shell snippet (`"a && b"`); several elements are a
/// program and its arguments, passed through without re-quoting.
pub fn argv_command(argv: &[String]) -> Result<Command> {
    match argv {
        [] => Err(TrainwatchError::ConfigError("no command given".to_string())),
        [snippet] => Ok(shell_command(snippet)),
        [program, args @ ..] => {
            let mut c = Command::new(program);
            c.args(args);
            Ok(c)
        }
    }
}

/// Spawn the shell snippet `cmd` in the background with stdout and stderr
/// redirected to `log`.
pub fn spawn_background(
    label: &str,
    cmd: &str,
    log: &Path,
    registry: &TaskRegistry,
) -> Result<TaskHandle> {
    spawn_background_command(label, shell_command(cmd), log, registry)
}

/// Spawn `command` in the background with stdout and stderr redirected to
/// `log`.
///
/// The log file is truncated (and created along with its parent directory
/// if missing), so the relay and the detection window only ever see this
/// run's output. On unix the task leads a new process group so that
/// termination reaches everything it forks. The new task is registered
/// before this returns.
pub fn spawn_background_command(
    label: &str,
    mut command: Command,
    log: &Path,
    registry: &TaskRegistry,
) -> Result<TaskHandle> {
    if let Some(parent) = log.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {:?}", parent))?;
        }
    }
    let out = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(log)
        .with_context(|| format!("opening log sink {:?}", log))?;
    let err = out
        .try_clone()
        .with_context(|| format!("duplicating log sink {:?}", log))?;

    command
        .stdin(Stdio::null())
        .stdout(Stdio::from(out))
        .stderr(Stdio::from(err));

    #[cfg(unix)]
    let scope = {
        command.process_group(0);
        SignalScope::Group
    };
    #[cfg(not(unix))]
    let scope = SignalScope::Process;

    let child = command
        .spawn()
        .with_context(|| format!("spawning background process for '{label}'"))?;

    let handle = TaskHandle::new(label, child, scope);
    info!(
        label,
        pid = ?handle.pid(),
        log = ?log,
        command = ?command.as_std(),
        "started background task"
    );
    registry.register(handle.clone());
    Ok(handle)
}

/// Spawn `cmd` attached to this process's stdio.
///
/// The task stays in our process group so it keeps the terminal and gets
/// Ctrl-C directly.
pub fn spawn_foreground(label: &str, cmd: &str, registry: &TaskRegistry) -> Result<TaskHandle> {
    let mut command = shell_command(cmd);
    command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    let child = command
        .spawn()
        .with_context(|| format!("spawning foreground process for '{label}'"))?;

    let handle = TaskHandle::new(label, child, SignalScope::Process);
    info!(label, pid = ?handle.pid(), cmd, "started foreground task");
    registry.register(handle.clone());
    Ok(handle)
}

/// Wait for a task to exit by polling its liveness every `interval`.
pub async fn wait_for_exit(handle: &TaskHandle, interval: Duration) -> Result<ExitStatus> {
    let mut poller = Poller::new(interval);
    loop {
        if let Some(status) = handle.try_exit()? {
            debug!(label = %handle.label(), ?status, elapsed = ?poller.elapsed(), "task exited");
            return Ok(status);
        }
        // No cancel token or deadline here, so every tick is `Due`.
        poller.tick().await;
    }
}
