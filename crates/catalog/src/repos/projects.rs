//! Project repository trait.

use crate::error::CatalogResult;
use async_trait::async_trait;
use depot_core::Project;
use uuid::Uuid;

/// Repository for project records.
#[async_trait]
pub trait ProjectRepo: Send + Sync {
    /// Create a project. Fails with `AlreadyExists` if the name is taken.
    async fn create_project(&self, project: &Project) -> CatalogResult<()>;

    /// Get a project by ID.
    async fn find_project(&self, project_id: Uuid) -> CatalogResult<Option<Project>>;

    async fn project_exists(&self, project_id: Uuid) -> CatalogResult<bool>;

    /// List all projects, newest first.
    async fn list_projects(&self) -> CatalogResult<Vec<Project>>;

    /// Delete a project and all of its version records.
    async fn delete_project(&self, project_id: Uuid) -> CatalogResult<()>;
}
