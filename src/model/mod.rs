//! Pot, plant and sensor data structures plus status classification.
//!
//! This module holds the plain data exchanged with the pot server and kept
//! in local storage, and the pure threshold classifier that turns raw
//! readings into status labels.

pub mod classify;
pub mod data;

// Re-export commonly used items
pub use classify::{classify, status_summary, Classification, Dimension, ThresholdConfig};
pub use data::{
    AcceptableRange, DeviceRecord, PlantCatalogEntry, Pot, PotId, SensorReadings, SensorSnapshot,
    StatusLabels,
};
