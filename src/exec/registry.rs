// src/exec/registry.rs

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{info, warn};

use crate::poll::{Poller, Tick};

use super::TaskHandle;

/// Every task spawned during one orchestrator run.
///
/// The registry only grows: there is no remove operation, and entries for
/// tasks that already finished are simply skipped at teardown. It is owned
/// by the orchestrator's top-level scope and cloned (cheaply, it's an `Arc`)
/// into the spawn calls and the signal handler.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<Mutex<Vec<TaskHandle>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handle: TaskHandle) {
        let mut tasks = match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tasks.push(handle);
    }

    pub fn len(&self) -> usize {
        match self.tasks.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<TaskHandle> {
        match self.tasks.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Send SIGTERM to every registered task that still has something
    /// running (for background tasks, anything left in its process group).
    ///
    /// Returns the number of tasks a signal was delivered to.
    pub fn terminate_all(&self) -> usize {
        let tasks = self.snapshot();

        let mut signalled = 0;
        for task in &tasks {
            if task.terminate() {
                warn!(label = %task.label(), pid = ?task.pid(), "terminated background task");
                signalled += 1;
            }
        }

        info!(registered = tasks.len(), signalled, "background task teardown complete");
        signalled
    }

    /// [`terminate_all`](Self::terminate_all), then SIGKILL whatever is
    /// still alive after `grace`.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        let signalled = self.terminate_all();
        if signalled == 0 {
            return 0;
        }

        let tasks = self.snapshot();
        let mut poller = Poller::new(Duration::from_millis(50)).with_deadline(grace);
        while poller.tick().await == Tick::Due {
            if !tasks.iter().any(TaskHandle::is_alive) {
                return signalled;
            }
        }

        for task in tasks.iter().filter(|t| t.is_alive()) {
            if task.kill() {
                warn!(label = %task.label(), pid = ?task.pid(), ?grace, "task ignored SIGTERM; sent SIGKILL");
            }
        }
        signalled
    }
}
