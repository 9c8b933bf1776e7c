//! Poll loops that keep cached pot snapshots fresh, and status alerts.
//!
//! A [`Poller`] follows one pot, the way a detail view does; a
//! [`FleetMonitor`] walks every stored pot in the background and raises
//! [`Alert`]s when a condition leaves its range. Both write through the
//! single-writer store, and both stop when their [`MonitorHandle`] is
//! stopped or dropped.

pub mod alerts;
pub mod fleet;
pub mod poller;

// Re-export commonly used items
pub use alerts::{Alert, AlertSink, AlertTracker, CollectingAlertSink, LogAlertSink};
pub use fleet::FleetMonitor;
pub use poller::{snapshot_stream, PollEvent, Poller};

use crate::error::{PotError, Result};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Reject a zero poll period, which `tokio::time::interval` cannot tick on.
pub(crate) fn poll_period(period: Duration) -> Result<Duration> {
    if period.is_zero() {
        return Err(PotError::invalid_input("poll interval must be greater than zero"));
    }
    Ok(period)
}

/// Stop signal and task of a running poll loop.
#[derive(Debug)]
pub struct MonitorHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub(crate) fn new(stop: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        Self { stop, task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the loop to stop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("Monitor task failed: {}", e);
        }
    }
}
