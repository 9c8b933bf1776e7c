//! Background monitoring of every stored pot.

use crate::api::PotApi;
use crate::error::Result;
use crate::monitor::alerts::{AlertSink, AlertTracker};
use crate::monitor::poller::PollEvent;
use crate::monitor::{poll_period, MonitorHandle};
use crate::model::PotId;
use crate::store::{PotStoreHandle, SnapshotOutcome};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Polls all pots in the store on one interval and raises alerts.
pub struct FleetMonitor<A: PotApi> {
    api: A,
    store: PotStoreHandle,
    period: Duration,
    sink: Arc<dyn AlertSink>,
    events: Option<mpsc::Sender<PollEvent>>,
}

impl<A: PotApi> FleetMonitor<A> {
    pub fn new(api: A, store: PotStoreHandle, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            api,
            store,
            period: Duration::from_millis(crate::DEFAULT_FLEET_INTERVAL_MS),
            sink,
            events: None,
        }
    }

    /// Set the round period. Zero is rejected.
    pub fn with_interval(mut self, period: Duration) -> Result<Self> {
        self.period = poll_period(period)?;
        Ok(self)
    }

    /// Forward every poll event to a channel as well.
    pub fn with_events(mut self, events: mpsc::Sender<PollEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Start monitoring on the current runtime.
    pub fn spawn(self) -> MonitorHandle {
        let (stop, stopped) = watch::channel(false);
        let task = tokio::spawn(self.run(stopped));
        MonitorHandle::new(stop, task)
    }

    async fn run(self, mut stopped: watch::Receiver<bool>) {
        info!("Monitoring all pots every {:?}", self.period);
        let mut ticker = time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tracker = AlertTracker::new();
        let mut seen: HashSet<PotId> = HashSet::new();

        loop {
            tokio::select! {
                biased;
                _ = stopped.changed() => break,
                _ = ticker.tick() => {}
            }

            let ids: Vec<PotId> = self.store.list().into_iter().map(|p| p.id).collect();
            for gone in seen.iter().filter(|id| !ids.contains(id)) {
                tracker.forget(gone);
            }
            seen = ids.iter().cloned().collect();

            for id in ids {
                let poll = self.poll_one(&id, &mut tracker);
                tokio::select! {
                    biased;
                    _ = stopped.changed() => {
                        debug!("Fleet monitor stopped mid-round");
                        return;
                    }
                    _ = poll => {}
                }
            }
        }

        debug!("Fleet monitor stopped");
    }

    async fn poll_one(&self, id: &PotId, tracker: &mut AlertTracker) {
        let issued_at = Utc::now();
        let event = match self.api.fetch_device(id).await {
            Ok(record) => PollEvent::Snapshot {
                id: id.clone(),
                snapshot: record.snapshot(issued_at),
                record,
            },
            Err(e) => {
                warn!("Failed to fetch plant data for {}: {}", id, e);
                PollEvent::Failed {
                    id: id.clone(),
                    error: e.to_string(),
                }
            }
        };

        if let PollEvent::Snapshot { snapshot, .. } = &event {
            match self.store.apply_snapshot(id, snapshot.clone()).await {
                Ok(SnapshotOutcome::Applied) => {
                    if let Some(pot) = self.store.get(id) {
                        for alert in tracker.observe(&pot) {
                            self.sink.deliver(&alert);
                        }
                    }
                }
                Ok(outcome) => debug!("Snapshot for {} not applied: {:?}", id, outcome),
                Err(e) => warn!("Failed to store snapshot for {}: {}", id, e),
            }
        }

        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}
