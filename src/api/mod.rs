//! Client for the remote pot server.
//!
//! The server exposes a small JSON API: the plant catalog, device snapshots
//! by pot identifier, plant assignment, renaming, and push token
//! registration. Bodies are plain JSON with no schema versioning.

pub mod client;
pub mod config;

// Re-export commonly used items
pub use client::{HttpPotApi, PotApi};
pub use config::ClientConfig;
