//! Local pot collection, its persistence, and the single-writer store task.

pub mod actor;
pub mod collection;
pub mod storage;

// Re-export commonly used items
pub use actor::{PotStore, PotStoreHandle};
pub use collection::{InsertOutcome, PotCollection, SnapshotOutcome};
pub use storage::{JsonFileStorage, MemoryStorage, PotStorage};
