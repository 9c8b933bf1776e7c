//! Error handling for the smartpot client crate.

/// A specialized `Result` type for smartpot operations.
pub type Result<T> = std::result::Result<T, PotError>;

/// The main error type for smartpot operations.
#[derive(Debug, thiserror::Error)]
pub enum PotError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON payload could not be encoded or decoded
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// Acceptable range with min > max or non-finite bounds
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Pot token or name rejected before any request was made
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No pot with this identifier in the local collection
    #[error("Pot not found: {0}")]
    PotNotFound(String),

    /// Local storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The pot store task is gone
    #[error("Pot store is closed")]
    StoreClosed,
}

impl PotError {
    /// Create a new network error
    pub fn network_error(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new server error
    pub fn server_error(status: u16, msg: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: msg.into(),
        }
    }

    /// Create a new range error
    pub fn invalid_range(msg: impl Into<String>) -> Self {
        Self::InvalidRange(msg.into())
    }

    /// Create a new input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new not-found error
    pub fn pot_not_found(id: impl std::fmt::Display) -> Self {
        Self::PotNotFound(id.to_string())
    }

    /// Create a new storage error
    pub fn storage_error(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<reqwest::Error> for PotError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::server_error(status.as_u16(), err.to_string())
        } else if err.is_decode() {
            Self::Network(format!("failed to decode response: {}", err))
        } else {
            Self::Network(err.to_string())
        }
    }
}
