// SPDX-License-Identifier: MIT

//! Coordinated shutdown (§5, §9): one shared `watch` signal every loop
//! selects on, plus a wait-group of `JoinHandle`s awaited (bounded) before
//! the daemon marks itself stopped and cleans up peer rows.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Shared by every loop (dispatcher, gate worker, watchdog, loop detector,
/// event cleanup). Cloning is cheap; each clone observes the same signal.
#[derive(Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Signal every loop to stop on its next check.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `trigger()` has been called. Used inside `tokio::select!`
    /// alongside a ticker so a loop exits between iterations, never mid-tick.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        let _ = rx.changed().await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// The wait-group of loop tasks. `stop()` triggers shutdown and waits
/// (bounded) for every tracked task to return, matching the shutdown
/// protocol's ordering: signal, drain, mark stopped, clean up peers.
#[derive(Default)]
pub struct WaitGroup {
    handles: Vec<JoinHandle<()>>,
}

impl WaitGroup {
    pub fn track(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    /// Await every tracked task, up to `grace`. A task still running after
    /// the grace period is aborted — this only happens if a loop ignored
    /// its shutdown signal, which is itself a bug worth logging loudly.
    pub async fn join(self, grace: Duration) {
        match tokio::time::timeout(grace, join_all(self.handles)).await {
            Ok(()) => {}
            Err(_) => warn!("shutdown grace period elapsed with loops still running; aborting"),
        }
    }
}

async fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            if e.is_panic() {
                warn!(error = %e, "worker loop panicked during shutdown");
            }
        }
    }
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
