//! Single-writer pot store.
//!
//! One task owns the [`PotCollection`] and its storage backend. Every other
//! component talks to it through a cloneable [`PotStoreHandle`] that sends
//! [`StoreCommand`]s over a channel, so mutations are applied one at a time
//! in arrival order. After each successful mutation the whole list is
//! published on a watch channel and persisted on the blocking pool; the
//! task waits for each write before taking the next command.

use crate::error::{PotError, Result};
use crate::model::{PlantCatalogEntry, Pot, PotId, SensorSnapshot};
use crate::store::collection::{InsertOutcome, PotCollection, SnapshotOutcome};
use crate::store::storage::PotStorage;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info};

const COMMAND_BUFFER: usize = 64;

/// Messages accepted by the store task.
#[derive(Debug)]
pub enum StoreCommand {
    Add {
        pot: Pot,
        reply: oneshot::Sender<Result<InsertOutcome>>,
    },
    Remove {
        id: PotId,
        reply: oneshot::Sender<Result<Option<Pot>>>,
    },
    Rename {
        id: PotId,
        name: String,
        reply: oneshot::Sender<Result<Pot>>,
    },
    AssignPlant {
        id: PotId,
        plant: PlantCatalogEntry,
        reply: oneshot::Sender<Result<Pot>>,
    },
    ApplySnapshot {
        id: PotId,
        snapshot: SensorSnapshot,
        reply: oneshot::Sender<Result<SnapshotOutcome>>,
    },
    Clear {
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Owner of the pot collection. Constructed through [`PotStore::spawn`].
pub struct PotStore<S: PotStorage> {
    pots: PotCollection,
    storage: Arc<S>,
    commands: mpsc::Receiver<StoreCommand>,
    published: watch::Sender<Vec<Pot>>,
}

impl<S: PotStorage> PotStore<S> {
    /// Load the stored list once and start the store task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(storage: S) -> Result<PotStoreHandle> {
        let pots = PotCollection::from_pots(storage.load()?);
        info!("Loaded {} pots from storage", pots.len());

        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (published, state) = watch::channel(pots.as_slice().to_vec());

        let store = PotStore {
            pots,
            storage: Arc::new(storage),
            commands: rx,
            published,
        };
        tokio::spawn(store.run());

        Ok(PotStoreHandle { commands: tx, state })
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.handle(command).await;
        }
        debug!("Pot store stopped: all handles dropped");
    }

    async fn handle(&mut self, command: StoreCommand) {
        match command {
            StoreCommand::Add { pot, reply } => {
                let id = pot.id.clone();
                let outcome = self.pots.insert(pot);
                let result = match outcome {
                    InsertOutcome::Added => {
                        info!("Added pot {}", id);
                        self.commit().await.map(|_| outcome)
                    }
                    InsertOutcome::AlreadyPresent => Ok(outcome),
                };
                let _ = reply.send(result);
            }
            StoreCommand::Remove { id, reply } => {
                let result = match self.pots.remove(&id) {
                    Some(pot) => {
                        info!("Removed pot {}", id);
                        self.commit().await.map(|_| Some(pot))
                    }
                    None => Ok(None),
                };
                let _ = reply.send(result);
            }
            StoreCommand::Rename { id, name, reply } => {
                let result = match self.pots.rename(&id, &name).cloned() {
                    Some(pot) => self.commit().await.map(|_| pot),
                    None => Err(PotError::pot_not_found(&id)),
                };
                let _ = reply.send(result);
            }
            StoreCommand::AssignPlant { id, plant, reply } => {
                let result = match self.pots.assign_plant(&id, plant).cloned() {
                    Some(pot) => self.commit().await.map(|_| pot),
                    None => Err(PotError::pot_not_found(&id)),
                };
                let _ = reply.send(result);
            }
            StoreCommand::ApplySnapshot { id, snapshot, reply } => {
                let outcome = self.pots.apply_snapshot(&id, snapshot);
                let result = match outcome {
                    SnapshotOutcome::Applied => self.commit().await.map(|_| outcome),
                    SnapshotOutcome::Stale | SnapshotOutcome::UnknownPot => {
                        debug!("Snapshot for {} not applied: {:?}", id, outcome);
                        Ok(outcome)
                    }
                };
                let _ = reply.send(result);
            }
            StoreCommand::Clear { reply } => {
                self.pots.clear();
                self.published.send_replace(Vec::new());
                let result = self
                    .blocking(|storage| storage.clear())
                    .await
                    .inspect(|_| info!("Cleared all pots"))
                    .inspect_err(|e| error!("Failed to clear stored pots: {}", e));
                let _ = reply.send(result);
            }
        }
    }

    /// Publish the current list and overwrite the stored copy.
    async fn commit(&mut self) -> Result<()> {
        let pots = self.pots.as_slice().to_vec();
        self.published.send_replace(pots.clone());
        self.blocking(move |storage| storage.save(&pots))
            .await
            .inspect_err(|e| error!("Failed to persist pots: {}", e))
    }

    /// Run a storage call on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> Result<T> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || op(storage.as_ref()))
            .await
            .map_err(|e| PotError::storage_error(format!("storage task failed: {}", e)))?
    }
}

/// Cloneable access to the pot store.
#[derive(Debug, Clone)]
pub struct PotStoreHandle {
    commands: mpsc::Sender<StoreCommand>,
    state: watch::Receiver<Vec<Pot>>,
}

impl PotStoreHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> StoreCommand,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| PotError::StoreClosed)?;
        response.await.map_err(|_| PotError::StoreClosed)?
    }

    /// Add a pot unless one with the same identifier exists.
    pub async fn add(&self, pot: Pot) -> Result<InsertOutcome> {
        self.request(|reply| StoreCommand::Add { pot, reply }).await
    }

    /// Remove a pot, returning it if it was present.
    pub async fn remove(&self, id: &PotId) -> Result<Option<Pot>> {
        let id = id.clone();
        self.request(|reply| StoreCommand::Remove { id, reply }).await
    }

    pub async fn rename(&self, id: &PotId, name: impl Into<String>) -> Result<Pot> {
        let id = id.clone();
        let name = name.into();
        self.request(|reply| StoreCommand::Rename { id, name, reply })
            .await
    }

    pub async fn assign_plant(&self, id: &PotId, plant: PlantCatalogEntry) -> Result<Pot> {
        let id = id.clone();
        self.request(|reply| StoreCommand::AssignPlant { id, plant, reply })
            .await
    }

    /// Merge a fetched snapshot into the pot's cached fields.
    pub async fn apply_snapshot(&self, id: &PotId, snapshot: SensorSnapshot) -> Result<SnapshotOutcome> {
        let id = id.clone();
        self.request(|reply| StoreCommand::ApplySnapshot { id, snapshot, reply })
            .await
    }

    /// Remove every pot and the stored list.
    pub async fn clear(&self) -> Result<()> {
        self.request(|reply| StoreCommand::Clear { reply }).await
    }

    pub fn list(&self) -> Vec<Pot> {
        self.state.borrow().clone()
    }

    pub fn get(&self, id: &PotId) -> Option<Pot> {
        self.state.borrow().iter().find(|p| &p.id == id).cloned()
    }

    pub fn contains(&self, id: &PotId) -> bool {
        self.state.borrow().iter().any(|p| &p.id == id)
    }

    /// Receiver that observes every published list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Pot>> {
        self.state.clone()
    }

    /// Stream of published lists, starting with the current one.
    pub fn changes(&self) -> WatchStream<Vec<Pot>> {
        WatchStream::new(self.state.clone())
    }
}
