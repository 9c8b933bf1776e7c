//! Periodic polling of one pot's sensor snapshot.

use crate::api::PotApi;
use crate::error::Result;
use crate::model::{DeviceRecord, PotId, SensorSnapshot};
use crate::monitor::{poll_period, MonitorHandle};
use crate::store::{PotStoreHandle, SnapshotOutcome};
use chrono::Utc;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Outcome of one poll tick.
#[derive(Debug, Clone)]
pub enum PollEvent {
    Snapshot {
        id: PotId,
        record: DeviceRecord,
        snapshot: SensorSnapshot,
    },
    Failed {
        id: PotId,
        error: String,
    },
}

impl PollEvent {
    pub fn pot_id(&self) -> &PotId {
        match self {
            PollEvent::Snapshot { id, .. } | PollEvent::Failed { id, .. } => id,
        }
    }
}

/// Stream that fetches the pot once per tick, starting immediately.
///
/// Each request is awaited before the next tick is taken, so requests never
/// overlap; ticks missed during a slow request are skipped. The stream never
/// ends on its own. Must be polled within a tokio runtime.
///
/// Fails with [`PotError::InvalidInput`](crate::PotError::InvalidInput) for a
/// zero period.
pub fn snapshot_stream<A: PotApi>(
    api: A,
    id: PotId,
    period: Duration,
) -> Result<BoxStream<'static, PollEvent>> {
    let period = poll_period(period)?;
    let stream = stream::unfold(
        (api, id, None::<time::Interval>),
        move |(api, id, ticker)| async move {
            let mut ticker = ticker.unwrap_or_else(|| {
                let mut ticker = time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                ticker
            });
            ticker.tick().await;

            let issued_at = Utc::now();
            let event = match api.fetch_device(&id).await {
                Ok(record) => PollEvent::Snapshot {
                    id: id.clone(),
                    snapshot: record.snapshot(issued_at),
                    record,
                },
                Err(err) => PollEvent::Failed {
                    id: id.clone(),
                    error: err.to_string(),
                },
            };
            Some((event, (api, id, Some(ticker))))
        },
    );

    Ok(Box::pin(stream))
}

/// Keeps one pot's cached snapshot fresh until stopped.
pub struct Poller<A: PotApi> {
    api: A,
    store: PotStoreHandle,
    id: PotId,
    period: Duration,
    events: Option<mpsc::Sender<PollEvent>>,
}

impl<A: PotApi> Poller<A> {
    pub fn new(api: A, store: PotStoreHandle, id: PotId) -> Self {
        Self {
            api,
            store,
            id,
            period: Duration::from_millis(crate::DEFAULT_POLL_INTERVAL_MS),
            events: None,
        }
    }

    /// Set the poll period. Zero is rejected.
    pub fn with_interval(mut self, period: Duration) -> Result<Self> {
        self.period = poll_period(period)?;
        Ok(self)
    }

    /// Forward every poll event to a channel as well.
    pub fn with_events(mut self, events: mpsc::Sender<PollEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Start polling on the current runtime.
    ///
    /// Dropping the returned handle stops the poller; a response still in
    /// flight at that moment is discarded.
    pub fn spawn(self) -> MonitorHandle {
        let (stop, stopped) = watch::channel(false);
        let task = tokio::spawn(self.run(stopped));
        MonitorHandle::new(stop, task)
    }

    async fn run(self, mut stopped: watch::Receiver<bool>) {
        info!("Polling pot {} every {:?}", self.id, self.period);
        let mut events = match snapshot_stream(self.api.clone(), self.id.clone(), self.period) {
            Ok(events) => events,
            Err(e) => {
                error!("Cannot poll pot {}: {}", self.id, e);
                return;
            }
        };

        loop {
            let event = tokio::select! {
                biased;
                _ = stopped.changed() => break,
                event = events.next() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let keep_going = match &event {
                PollEvent::Snapshot { snapshot, .. } => {
                    match self.store.apply_snapshot(&self.id, snapshot.clone()).await {
                        Ok(SnapshotOutcome::UnknownPot) => {
                            info!("Pot {} is no longer stored, stopping poller", self.id);
                            false
                        }
                        Ok(outcome) => {
                            debug!("Snapshot for {}: {:?}", self.id, outcome);
                            true
                        }
                        Err(e) => {
                            warn!("Failed to store snapshot for {}: {}", self.id, e);
                            true
                        }
                    }
                }
                PollEvent::Failed { error, .. } => {
                    warn!("Failed to fetch pot {}: {}", self.id, error);
                    true
                }
            };

            if let Some(tx) = &self.events {
                if tx.send(event).await.is_err() {
                    debug!("Poll event receiver for {} closed", self.id);
                }
            }

            if !keep_going {
                break;
            }
        }

        debug!("Poller for {} stopped", self.id);
    }
}
