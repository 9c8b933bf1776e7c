//! # smartpot - Smart Plant Pot Client
//!
//! Library and command-line client for smart plant pots. It pairs a pot
//! from its scanned QR token, keeps a local list of paired pots, polls the
//! pot server for sensor readings, and classifies each reading against the
//! assigned plant's acceptable range.
//!
//! ## Features
//!
//! - **Pairing**: resolve a scanned token and store the pot exactly once
//! - **Single-writer store**: one task owns the pot list and persists it
//! - **Polling**: per-pot and whole-fleet poll loops with stale-result rejection
//! - **Status evaluation**: one pure threshold classifier for every dimension
//! - **Alerts**: raised when a condition leaves its range
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smartpot::{pair, ClientConfig, HttpPotApi, JsonFileStorage, PotStore, Poller};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = HttpPotApi::new(ClientConfig::default())?;
//!     let store = PotStore::spawn(JsonFileStorage::new("./data"))?;
//!
//!     if let smartpot::PairOutcome::Added(pot) = pair(&api, &store, "pot-token").await? {
//!         let poller = Poller::new(api, store.clone(), pot.id).spawn();
//!         tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!         poller.stop().await;
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod monitor;
pub mod pairing;
pub mod store;

// Re-export public API
pub use api::{ClientConfig, HttpPotApi, PotApi};
pub use config::AppConfig;
pub use error::{PotError, Result};
pub use model::{
    classify, status_summary, AcceptableRange, Classification, DeviceRecord, Dimension,
    PlantCatalogEntry, Pot, PotId, SensorReadings, SensorSnapshot, StatusLabels, ThresholdConfig,
};
pub use monitor::{Alert, AlertSink, FleetMonitor, MonitorHandle, PollEvent, Poller};
pub use pairing::{pair, PairOutcome};
pub use store::{JsonFileStorage, MemoryStorage, PotStorage, PotStore, PotStoreHandle};

/// The default pot server
pub const DEFAULT_SERVER_URL: &str = "http://13.53.201.187:8080";

/// The default request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// The default single-pot poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// The default whole-fleet poll interval in milliseconds
pub const DEFAULT_FLEET_INTERVAL_MS: u64 = 10_000;
