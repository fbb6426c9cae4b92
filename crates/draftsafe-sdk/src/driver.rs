//! Runs a coordinator's timers on the tokio runtime.
//!
//! The coordinator only knows deadlines. The driver is a single task that
//! sleeps until the earliest one, calls `tick`, and goes back to sleep. An
//! edit wakes it early so the new deadlines are picked up.

use crate::coordinator::AutoSaveCoordinator;
use crate::persistence::Persistence;
use draftsafe_core::{Clock, Millis, SystemClock};
use draftsafe_store::KeyValueCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Wall-clock time that advances with tokio's clock.
///
/// Reads the system clock once and then follows `tokio::time::Instant`, so a
/// paused test runtime moves it deterministically.
#[derive(Clone, Debug)]
pub struct TokioClock {
    origin: Instant,
    epoch_ms: Millis,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            epoch_ms: SystemClock.now_ms(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> Millis {
        self.epoch_ms + self.origin.elapsed().as_millis() as Millis
    }
}

/// Handle to a running driver task.
///
/// Dropping the handle disposes the coordinator and signals the task to
/// stop. A save already running is left to settle in the background; use
/// [`shutdown`](Self::shutdown) to wait for it.
pub struct DriverHandle<P, C, K>
where
    P: Persistence,
    C: KeyValueCache,
    K: Clock,
{
    coordinator: Arc<AutoSaveCoordinator<P, C, K>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl<P, C, K> DriverHandle<P, C, K>
where
    P: Persistence,
    C: KeyValueCache,
    K: Clock,
{
    pub fn coordinator(&self) -> &Arc<AutoSaveCoordinator<P, C, K>> {
        &self.coordinator
    }

    /// Dispose the coordinator and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.coordinator.dispose();
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl<P, C, K> Drop for DriverHandle<P, C, K>
where
    P: Persistence,
    C: KeyValueCache,
    K: Clock,
{
    fn drop(&mut self) {
        self.coordinator.dispose();
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        // detached, not aborted: an in-flight persist must still settle
        drop(self.task.take());
    }
}

/// Spawn a task that fires the coordinator's timers as they come due.
///
/// Must be called from within a tokio runtime.
pub fn spawn_driver<P, C, K>(coordinator: Arc<AutoSaveCoordinator<P, C, K>>) -> DriverHandle<P, C, K>
where
    P: Persistence,
    C: KeyValueCache,
    K: Clock,
{
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    let worker = Arc::clone(&coordinator);

    let task = tokio::spawn(async move {
        loop {
            if worker.is_disposed() {
                break;
            }
            let sleep_for = worker
                .next_deadline()
                .map(|due| Duration::from_millis(due.saturating_sub(worker.clock().now_ms())));

            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = worker.wake().notified() => continue,
                _ = sleep_or_park(sleep_for) => {
                    let report = worker.tick().await;
                    if !report.is_idle() {
                        debug!(?report, "driver tick");
                    }
                }
            }
        }
        debug!("auto-save driver stopped");
    });

    DriverHandle {
        coordinator,
        shutdown: Some(shutdown_tx),
        task: Some(task),
    }
}

async fn sleep_or_park(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending::<()>().await,
    }
}
