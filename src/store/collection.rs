//! In-memory pot collection keyed by pot identifier.

use crate::model::{Pot, PotId, PlantCatalogEntry, SensorSnapshot, ThresholdConfig};
use serde::{Deserialize, Serialize};

/// Result of inserting a pot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    Added,
    AlreadyPresent,
}

/// Result of applying a fetched snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotOutcome {
    Applied,
    /// A snapshot from a later request was already stored
    Stale,
    /// The pot was removed while the request was in flight
    UnknownPot,
}

/// Insertion-ordered pots. Identifiers are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PotCollection {
    pots: Vec<Pot>,
}

impl PotCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a stored list. Later duplicates of an identifier are dropped.
    pub fn from_pots(pots: Vec<Pot>) -> Self {
        let mut collection = Self::new();
        for pot in pots {
            if collection.insert(pot) == InsertOutcome::AlreadyPresent {
                tracing::warn!("Dropping duplicate pot from stored list");
            }
        }
        collection
    }

    pub fn len(&self) -> usize {
        self.pots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pots.is_empty()
    }

    pub fn as_slice(&self) -> &[Pot] {
        &self.pots
    }

    pub fn ids(&self) -> Vec<PotId> {
        self.pots.iter().map(|p| p.id.clone()).collect()
    }

    pub fn contains(&self, id: &PotId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &PotId) -> Option<&Pot> {
        self.pots.iter().find(|p| &p.id == id)
    }

    fn get_mut(&mut self, id: &PotId) -> Option<&mut Pot> {
        self.pots.iter_mut().find(|p| &p.id == id)
    }

    fn position(&self, id: &PotId) -> Option<usize> {
        self.pots.iter().position(|p| &p.id == id)
    }

    /// Append a pot unless its identifier is already present.
    pub fn insert(&mut self, pot: Pot) -> InsertOutcome {
        if self.contains(&pot.id) {
            return InsertOutcome::AlreadyPresent;
        }
        self.pots.push(pot);
        InsertOutcome::Added
    }

    /// Remove exactly the pot with this identifier.
    pub fn remove(&mut self, id: &PotId) -> Option<Pot> {
        let index = self.position(id)?;
        Some(self.pots.remove(index))
    }

    pub fn rename(&mut self, id: &PotId, name: &str) -> Option<&Pot> {
        let pot = self.get_mut(id)?;
        pot.name = name.to_string();
        Some(pot)
    }

    /// Attach a plant and re-evaluate the cached snapshot against it.
    pub fn assign_plant(&mut self, id: &PotId, plant: PlantCatalogEntry) -> Option<&Pot> {
        let pot = self.get_mut(id)?;
        pot.assigned_plant = Some(plant);
        if let Some(snapshot) = pot.snapshot.take() {
            pot.snapshot = Some(evaluate_snapshot(pot.assigned_plant.as_ref(), snapshot));
        }
        Some(pot)
    }

    /// Replace a pot's snapshot unless the stored one was fetched later.
    ///
    /// When the pot has a plant with known ranges the status labels are
    /// recomputed locally; otherwise the server's labels are kept.
    pub fn apply_snapshot(&mut self, id: &PotId, snapshot: SensorSnapshot) -> SnapshotOutcome {
        let Some(pot) = self.get_mut(id) else {
            return SnapshotOutcome::UnknownPot;
        };

        if let Some(current) = &pot.snapshot {
            if current.fetched_at > snapshot.fetched_at {
                return SnapshotOutcome::Stale;
            }
        }

        pot.snapshot = Some(evaluate_snapshot(pot.assigned_plant.as_ref(), snapshot));
        SnapshotOutcome::Applied
    }

    pub fn clear(&mut self) {
        self.pots.clear();
    }
}

fn evaluate_snapshot(plant: Option<&PlantCatalogEntry>, mut snapshot: SensorSnapshot) -> SensorSnapshot {
    if let Some(config) = plant.and_then(ThresholdConfig::from_plant) {
        snapshot.status = config.evaluate(&snapshot.readings).labels();
    }
    snapshot
}
