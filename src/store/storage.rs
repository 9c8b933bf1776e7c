//! Persistence of the pot list.
//!
//! The whole list is stored as one JSON document under a single key and is
//! overwritten on every save.

use crate::error::{PotError, Result};
use crate::model::Pot;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Storage key of the pot list.
pub const POTS_KEY: &str = "pots";

/// Backend that holds the serialized pot list.
///
/// Methods may block; the store runs them on tokio's blocking pool.
pub trait PotStorage: Send + Sync + 'static {
    /// Read the stored list. A missing list loads as empty.
    fn load(&self) -> Result<Vec<Pot>>;

    /// Overwrite the stored list.
    fn save(&self, pots: &[Pot]) -> Result<()>;

    /// Remove the stored list entirely.
    fn clear(&self) -> Result<()>;
}

/// Keeps the list in `<data_dir>/pots.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Store under `data_dir`, creating the directory on first save.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{}.json", POTS_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PotStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<Pot>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stored pots at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            PotError::storage_error(format!("corrupt pot list at {}: {}", self.path.display(), e))
        })
    }

    fn save(&self, pots: &[Pot]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(pots)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!("Saved {} pots to {}", pots.len(), self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the serialized list in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing list already stored.
    pub fn with_pots(pots: &[Pot]) -> Result<Self> {
        Ok(Self {
            data: Mutex::new(Some(serde_json::to_string(pots)?)),
        })
    }

    /// The raw stored document, if any.
    pub fn raw(&self) -> Option<String> {
        self.data.lock().ok().and_then(|data| data.clone())
    }
}

impl PotStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<Pot>> {
        let data = self
            .data
            .lock()
            .map_err(|_| PotError::storage_error("memory storage poisoned"))?;
        match data.as_deref() {
            Some(json) => Ok(serde_json::from_str(json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, pots: &[Pot]) -> Result<()> {
        let json = serde_json::to_string(pots)?;
        let mut data = self
            .data
            .lock()
            .map_err(|_| PotError::storage_error("memory storage poisoned"))?;
        *data = Some(json);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| PotError::storage_error("memory storage poisoned"))?;
        *data = None;
        Ok(())
    }
}

impl<S: PotStorage + Sync> PotStorage for std::sync::Arc<S> {
    fn load(&self) -> Result<Vec<Pot>> {
        (**self).load()
    }

    fn save(&self, pots: &[Pot]) -> Result<()> {
        (**self).save(pots)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}
