//! Application configuration loaded from `smartpot.toml`.
//!
//! Every section is optional; missing values fall back to the defaults
//! below. Command-line flags override whatever the file says.
//!
//! ```toml
//! [server]
//! base_url = "http://13.53.201.187:8080"
//! request_timeout_secs = 10   # 0 disables the timeout
//!
//! [polling]
//! interval_ms = 1000          # single-pot watch
//! fleet_interval_ms = 10000   # all pots
//!
//! [storage]
//! data_dir = "/home/me/.local/share/smartpot"
//! ```

use crate::api::ClientConfig;
use crate::error::{PotError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// File name looked up in the working directory when no path is given.
pub const CONFIG_FILE_NAME: &str = "smartpot.toml";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: crate::DEFAULT_SERVER_URL.to_string(),
            request_timeout_secs: crate::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub fleet_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: crate::DEFAULT_POLL_INTERVAL_MS,
            fleet_interval_ms: crate::DEFAULT_FLEET_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".local").join("share").join("smartpot"),
            None => PathBuf::from(".smartpot"),
        };
        Self { data_dir }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PotError::config_error(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(|e| {
            PotError::config_error(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load an explicit file, or `smartpot.toml` if present, or defaults.
    ///
    /// An explicitly named file must exist and parse.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let config = Self::load(path)?;
            info!("Loaded configuration from {}", path.display());
            return Ok(config);
        }

        let path = PathBuf::from(CONFIG_FILE_NAME);
        if path.exists() {
            match Self::load(&path) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    return Ok(config);
                }
                Err(e) => warn!("Ignoring {}: {}", path.display(), e),
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.server.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(PotError::config_error(format!(
                "server.base_url must start with http:// or https://, got {:?}",
                self.server.base_url
            )));
        }
        if self.polling.interval_ms == 0 || self.polling.fleet_interval_ms == 0 {
            return Err(PotError::config_error("polling intervals must be greater than zero"));
        }
        Ok(())
    }

    /// HTTP client settings derived from the `[server]` section.
    pub fn client_config(&self) -> ClientConfig {
        let timeout = match self.server.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        ClientConfig::new(&self.server.base_url).with_timeout(timeout)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    pub fn fleet_interval(&self) -> Duration {
        Duration::from_millis(self.polling.fleet_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            base_url = "http://localhost:3000/"
            request_timeout_secs = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.polling, PollingConfig::default());
        let client = config.client_config();
        assert_eq!(client.base_url, "http://localhost:3000");
        assert_eq!(client.request_timeout, None);
    }

    #[test]
    fn test_validate_rejects_bad_url_and_zero_interval() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.server.base_url = "ftp://pots".into();
        assert!(config.validate().is_err());

        config.server.base_url = crate::DEFAULT_SERVER_URL.into();
        config.polling.interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
