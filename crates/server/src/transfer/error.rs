//! Transfer error taxonomy.

use depot_catalog::CatalogError;
use depot_storage::StorageError;
use thiserror::Error;

/// Why an ingest or egress did not succeed.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    DuplicateVersion(String),

    #[error("{0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("stream aborted: {0}")]
    StreamAborted(String),

    #[error("catalog error: {0}")]
    Catalog(CatalogError),
}

impl TransferError {
    /// Stable machine-readable code, sent to clients in `failed` events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::DuplicateVersion(_) => "duplicate_version",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage_error",
            Self::StreamAborted(_) => "stream_aborted",
            Self::Catalog(_) => "catalog_error",
        }
    }
}

impl From<StorageError> for TransferError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Interrupted(msg) => Self::StreamAborted(msg),
            StorageError::TooLarge { limit } => {
                Self::Validation(format!("artifact exceeds the {limit} byte limit"))
            }
            StorageError::InvalidKey(msg) => Self::Validation(msg),
            StorageError::AlreadyExists(key) => {
                Self::DuplicateVersion(format!("artifact already exists: {key}"))
            }
            other => Self::Storage(other),
        }
    }
}

impl From<CatalogError> for TransferError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(msg) => Self::NotFound(msg),
            CatalogError::AlreadyExists(msg) => Self::DuplicateVersion(msg),
            other => Self::Catalog(other),
        }
    }
}

/// Result type for transfer operations.
pub type TransferResult<T> = std::result::Result<T, TransferError>;
