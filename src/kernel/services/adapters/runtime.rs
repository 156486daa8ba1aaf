//! Async runtime adapter: hosts background drivers such as autosave.

use crate::kernel::workspace::WorkspaceManager;
use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct AsyncRuntime {
    runtime: tokio::runtime::Runtime,
}

impl AsyncRuntime {
    pub fn new() -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .or_else(|e| {
                tracing::error!(
                    error = %e,
                    "Failed to create multi-thread tokio runtime, falling back to current-thread"
                );
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
            })?;
        Ok(Self { runtime })
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Polls the workspace's autosave deadlines every `period` until the
    /// returned handle is dropped.
    pub fn spawn_autosave(
        &self,
        workspace: Arc<Mutex<WorkspaceManager>>,
        period: Duration,
    ) -> AutosaveHandle {
        let period = period.max(Duration::from_millis(1));
        let task = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let result = match workspace.lock() {
                    Ok(mut ws) => ws.poll_autosave(Instant::now()),
                    Err(_) => {
                        tracing::error!("workspace lock poisoned, autosave stopped");
                        break;
                    }
                };
                match result {
                    Ok(0) => {}
                    Ok(flushed) => tracing::debug!(flushed, "autosave flushed tabs"),
                    Err(e) => tracing::warn!(error = %e, "autosave failed"),
                }
            }
        });
        tracing::debug!(period_ms = period.as_millis() as u64, "autosave driver started");
        AutosaveHandle { task }
    }
}

/// Stops the autosave driver when dropped.
pub struct AutosaveHandle {
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/runtime.rs"]
mod tests;
