//! Owned background tasks with deterministic cancellation
//!
//! Every task spawned through a [`Scheduler`] is tracked. After
//! [`Scheduler::cancel`] no delayed task starts its work and no new task is
//! accepted; [`Scheduler::shutdown`] additionally waits for all of them, so
//! work already in progress (an HTTP request, say) finishes first.

use crate::core::{LoggerError, Result};
use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Cancellation signal handed to long-running tasks
#[derive(Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the owning scheduler is cancelled
    pub async fn cancelled(&mut self) {
        // Err means the scheduler is gone, which counts as cancelled
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }
}

pub struct Scheduler {
    handle: Handle,
    cancel_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(handle: Handle) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            handle,
            cancel_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Scheduler bound to the runtime of the calling context
    pub fn current(component: &str) -> Result<Self> {
        let handle =
            Handle::try_current().map_err(|_| LoggerError::runtime_unavailable(component))?;
        Ok(Self::new(handle))
    }

    pub fn cancellation(&self) -> Cancellation {
        Cancellation {
            rx: self.cancel_tx.subscribe(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Spawn a long-running task; it should watch [`Scheduler::cancellation`]
    ///
    /// Returns `false` without spawning once cancelled.
    pub fn spawn<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_cancelled() {
            return false;
        }
        let handle = self.handle.spawn(task);
        self.track(handle);
        true
    }

    /// Run `task` after `delay` unless cancelled while waiting
    ///
    /// Returns `false` without spawning once cancelled.
    pub fn schedule<F>(&self, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_cancelled() {
            return false;
        }

        let mut cancellation = self.cancellation();
        let handle = self.handle.spawn(async move {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            task.await;
        });
        self.track(handle);
        true
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Number of tracked tasks that have not finished yet
    pub fn active_tasks(&self) -> usize {
        self.tasks.lock().iter().filter(|t| !t.is_finished()).count()
    }

    /// Signal cancellation without waiting
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Cancel and wait for every tracked task to finish
    pub async fn shutdown(&self) {
        self.cancel();
        loop {
            let tasks = std::mem::take(&mut *self.tasks.lock());
            if tasks.is_empty() {
                break;
            }
            for task in tasks {
                if let Err(e) = task.await {
                    if e.is_panic() {
                        eprintln!("[LOGGER ERROR] Scheduled task panicked: {}", e);
                    }
                }
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
