//! Version repository trait.

use crate::error::CatalogResult;
use async_trait::async_trait;
use depot_core::{Platform, VersionRecord};
use uuid::Uuid;

/// Repository for version records.
#[async_trait]
pub trait VersionRepo: Send + Sync {
    /// Get a version that belongs to the given project.
    async fn find_version(
        &self,
        project_id: Uuid,
        version_id: Uuid,
    ) -> CatalogResult<Option<VersionRecord>>;

    /// Whether the project already has `version` on `platform`.
    async fn version_exists(
        &self,
        project_id: Uuid,
        platform: Platform,
        version: &str,
    ) -> CatalogResult<bool>;

    /// Append a new version record.
    ///
    /// Fails with `NotFound` if the project is gone and `AlreadyExists` if the
    /// (project, platform, version) triple is already taken.
    async fn append_version(&self, project_id: Uuid, record: &VersionRecord)
    -> CatalogResult<()>;

    /// List a project's versions, newest first.
    async fn list_versions(&self, project_id: Uuid) -> CatalogResult<Vec<VersionRecord>>;

    /// Delete a version record, returning what was removed.
    async fn delete_version(
        &self,
        project_id: Uuid,
        version_id: Uuid,
    ) -> CatalogResult<VersionRecord>;
}
