//! Artifact storage for depot.
//!
//! This crate provides:
//! - The [`ArtifactStore`] abstraction with streaming and ranged reads
//! - A local filesystem backend with no-clobber publishing
//! - A staging area for uploads that have not been ingested yet

pub mod backends;
pub mod error;
pub mod key;
pub mod staging;
pub mod traits;

pub use backends::FilesystemBackend;
pub use error::{StorageError, StorageResult};
pub use key::ArtifactKey;
pub use staging::{StagedFile, StagingArea};
pub use traits::{ArtifactMeta, ArtifactRead, ArtifactStore, ByteStream, StreamingUpload};

use depot_core::config::StorageConfig;
use std::sync::Arc;

/// Create an artifact store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ArtifactStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            tracing::debug!(root = %backend.root().display(), "Filesystem storage ready");
            Ok(Arc::new(backend))
        }
    }
}
