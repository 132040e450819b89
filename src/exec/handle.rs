// src/exec/handle.rs

//! Shared handle to a spawned task process.

use std::io;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::process::Child;
use tracing::{debug, warn};

use crate::poll::{Poller, Tick};

/// How a termination signal reaches the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalScope {
    /// The task leads its own process group; signal every process in it,
    /// so children forked by `sh -c` go down with the shell.
    Group,
    /// The task shares our process group (foreground trainer); signal the
    /// process alone.
    Process,
}

/// Cloneable handle to one spawned process.
///
/// The Process Monitor polls it for liveness and the [`TaskRegistry`] keeps
/// a clone so that an interrupt can terminate it. Neither side ever blocks
/// on the child while holding the lock.
///
/// [`TaskRegistry`]: super::TaskRegistry
#[derive(Debug, Clone)]
pub struct TaskHandle {
    label: Arc<str>,
    pid: Option<u32>,
    scope: SignalScope,
    child: Arc<Mutex<Child>>,
}

impl TaskHandle {
    pub fn new(label: impl Into<Arc<str>>, child: Child, scope: SignalScope) -> Self {
        let pid = child.id();
        Self {
            label: label.into(),
            pid,
            scope,
            child: Arc::new(Mutex::new(child)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// OS process id captured at spawn time.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn scope(&self) -> SignalScope {
        self.scope
    }

    /// Non-blocking liveness check; reaps the exit status if the process
    /// has already finished.
    pub fn try_exit(&self) -> io::Result<Option<ExitStatus>> {
        self.lock().try_wait()
    }

    /// Whether anything the task started is still around.
    ///
    /// For a group-scoped task this stays true after the shell itself
    /// exited, as long as one of its children is alive.
    pub fn is_alive(&self) -> bool {
        let leader_running = matches!(self.try_exit(), Ok(None));
        match self.scope {
            SignalScope::Process => leader_running,
            SignalScope::Group => leader_running || self.send(None),
        }
    }

    /// Best-effort SIGTERM. Returns `true` if a signal was delivered.
    ///
    /// A task that is entirely gone is not an error; the call simply
    /// returns `false`.
    pub fn terminate(&self) -> bool {
        self.deliver(Kill::Term)
    }

    /// Best-effort SIGKILL.
    pub fn kill(&self) -> bool {
        self.deliver(Kill::Kill)
    }

    /// SIGTERM, wait up to `grace` for the task to go away, then SIGKILL
    /// whatever is left. Returns `true` if the first signal was delivered.
    ///
    /// The escalation is not verified: a process that survives SIGKILL
    /// (uninterruptible IO) is abandoned.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        if !self.terminate() {
            return false;
        }

        let mut poller = Poller::new(Duration::from_millis(50)).with_deadline(grace);
        while poller.tick().await == Tick::Due {
            if !self.is_alive() {
                debug!(label = %self.label, elapsed = ?poller.elapsed(), "task gone after SIGTERM");
                return true;
            }
        }

        if self.kill() {
            warn!(label = %self.label, pid = ?self.pid, ?grace, "task ignored SIGTERM; sent SIGKILL");
        }
        true
    }

    fn deliver(&self, kill: Kill) -> bool {
        // Reap a finished leader first so its zombie doesn't count as a
        // live target.
        let leader_exited = matches!(self.try_exit(), Ok(Some(_)));
        if leader_exited && self.scope == SignalScope::Process {
            return false;
        }

        let delivered = self.send(Some(kill));
        if delivered {
            debug!(label = %self.label, pid = ?self.pid, scope = ?self.scope, signal = ?kill, "signal sent");
        }
        delivered
    }

    #[cfg(unix)]
    fn send(&self, kill: Option<Kill>) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        let Some(raw) = self.pid.and_then(|p| i32::try_from(p).ok()) else {
            return false;
        };
        let pid = Pid::from_raw(raw);
        let sig = kill.map(|k| match k {
            Kill::Term => Signal::SIGTERM,
            Kill::Kill => Signal::SIGKILL,
        });

        let res = match self.scope {
            SignalScope::Group => signal::killpg(pid, sig),
            SignalScope::Process => signal::kill(pid, sig),
        };
        match res {
            Ok(()) => true,
            Err(Errno::ESRCH) => false,
            Err(e) => {
                debug!(label = %self.label, pid = raw, error = %e, "signal not delivered");
                false
            }
        }
    }

    #[cfg(not(unix))]
    fn send(&self, kill: Option<Kill>) -> bool {
        let mut child = self.lock();
        match kill {
            None => matches!(child.try_wait(), Ok(None)),
            Some(_) => child.start_kill().is_ok(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Child> {
        match self.child.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kill {
    Term,
    Kill,
}

/// Exit code for reporting; `-1` when the process was killed by a signal.
pub fn exit_code(status: &ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
