//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("artifact already exists: {0}")]
    AlreadyExists(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("range not satisfiable for artifact of {size} bytes")]
    RangeNotSatisfiable { size: u64 },

    #[error("artifact exceeds size limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("source stream interrupted: {0}")]
    Interrupted(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Whether this error originates from the incoming stream rather than the backend.
    pub fn is_source_error(&self) -> bool {
        matches!(self, Self::Interrupted(_) | Self::TooLarge { .. })
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
