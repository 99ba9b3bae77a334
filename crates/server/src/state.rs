//! Application state shared across handlers.

use crate::transfer::{Egress, Ingest, VersionLocks};
use depot_catalog::Catalog;
use depot_core::config::AppConfig;
use depot_storage::{ArtifactStore, StagingArea};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Artifact storage backend.
    pub storage: Arc<dyn ArtifactStore>,
    /// Project and version catalog.
    pub catalog: Arc<dyn Catalog>,
    /// Where multipart file parts are spooled before ingest.
    pub staging: StagingArea,
    /// Upload pipeline.
    pub ingest: Ingest,
    /// Download pipeline.
    pub egress: Egress,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ArtifactStore>,
        catalog: Arc<dyn Catalog>,
        staging: StagingArea,
    ) -> Self {
        let ingest = Ingest::new(
            storage.clone(),
            catalog.clone(),
            VersionLocks::new(),
            config.upload.size_limit(),
        );
        let egress = Egress::new(storage.clone(), catalog.clone());

        Self {
            config: Arc::new(config),
            storage,
            catalog,
            staging,
            ingest,
            egress,
        }
    }

    /// Effective upload size ceiling in bytes.
    pub fn size_limit(&self) -> u64 {
        self.config.upload.size_limit()
    }
}
