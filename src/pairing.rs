//! Pairing a physical pot from its scanned token.

use crate::api::PotApi;
use crate::error::Result;
use crate::model::{Pot, PotId};
use crate::store::{InsertOutcome, PotStoreHandle};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

/// Result of a pairing attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "pot", rename_all = "snake_case")]
pub enum PairOutcome {
    /// Newly stored; the caller continues with plant selection
    Added(Pot),
    /// This pot is already in the list
    AlreadyPresent(PotId),
}

/// Resolve a scanned token with the server and store the pot.
///
/// An already-stored token short-circuits before any request. A duplicate
/// that races past that check is still caught by the store, which never
/// holds two pots with the same identifier.
pub async fn pair<A: PotApi>(api: &A, store: &PotStoreHandle, token: &str) -> Result<PairOutcome> {
    let id = PotId::parse(token)?;

    if store.contains(&id) {
        info!("Pot {} is already in the list", id);
        return Ok(PairOutcome::AlreadyPresent(id));
    }

    let fetched_at = Utc::now();
    let record = api.fetch_device(&id).await?;
    let mut pot = Pot::from_device(record, fetched_at);
    // The server is asked about `id`; keep that as the key.
    pot.id = id.clone();

    match store.add(pot.clone()).await? {
        InsertOutcome::Added => {
            info!("Paired pot {} ({})", pot.id, pot.name);
            Ok(PairOutcome::Added(pot))
        }
        InsertOutcome::AlreadyPresent => Ok(PairOutcome::AlreadyPresent(id)),
    }
}
