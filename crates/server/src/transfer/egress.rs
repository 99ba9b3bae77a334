//! Egress pipeline: resolve a version and open its bytes for download.

use crate::transfer::error::{TransferError, TransferResult};
use depot_catalog::Catalog;
use depot_core::{ArtifactRef, ByteRange};
use depot_storage::{ArtifactKey, ArtifactRead, ArtifactStore, StorageError};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// How a download should be answered.
#[derive(Debug)]
pub enum ServeResult {
    /// The version lives at an external URL.
    Redirect { url: String },
    /// The whole file.
    Full(Download),
    /// A single byte range; `download.read.range` is always set.
    Partial(Download),
    /// The requested range lies outside a file of `total_size` bytes.
    Unsatisfiable { total_size: u64 },
}

/// An opened stored artifact plus the metadata needed for response headers.
#[derive(Debug)]
pub struct Download {
    pub read: ArtifactRead,
    pub file_name: String,
    pub sha256: Option<String>,
}

impl Download {
    /// Strong validator derived from the stored checksum.
    pub fn etag(&self) -> Option<String> {
        self.sha256.as_ref().map(|hash| format!("\"{hash}\""))
    }
}

#[derive(Clone)]
pub struct Egress {
    storage: Arc<dyn ArtifactStore>,
    catalog: Arc<dyn Catalog>,
}

impl Egress {
    pub fn new(storage: Arc<dyn ArtifactStore>, catalog: Arc<dyn Catalog>) -> Self {
        Self { storage, catalog }
    }

    /// Resolve `version_id` within `project_id` and open it, honoring `range`.
    ///
    /// Existence and range validity are settled before this returns, so the
    /// caller can commit to a status line.
    pub async fn serve(
        &self,
        project_id: Uuid,
        version_id: Uuid,
        range: Option<ByteRange>,
    ) -> TransferResult<ServeResult> {
        let project = self
            .catalog
            .find_project(project_id)
            .await?
            .ok_or_else(|| TransferError::NotFound(format!("project {project_id} not found")))?;
        let version = self
            .catalog
            .find_version(project_id, version_id)
            .await?
            .ok_or_else(|| TransferError::NotFound(format!("version {version_id} not found")))?;

        let file_name = match version.artifact_ref {
            Some(ArtifactRef::External { url }) => return Ok(ServeResult::Redirect { url }),
            Some(ArtifactRef::Stored { file_name }) => file_name,
            None => {
                return Err(TransferError::NotFound(format!(
                    "version {version_id} has no artifact"
                )));
            }
        };

        let key = ArtifactKey::new(project.name.as_str(), version.platform, file_name.as_str())?;
        let read = match self.storage.get(&key, range).await {
            Ok(read) => read,
            Err(StorageError::NotFound(_)) => {
                warn!(
                    project = %project.name,
                    version_id = %version_id,
                    key = %key,
                    "Version record points at a missing artifact"
                );
                return Err(TransferError::NotFound(format!(
                    "artifact for version {version_id} is missing"
                )));
            }
            Err(StorageError::RangeNotSatisfiable { size }) => {
                return Ok(ServeResult::Unsatisfiable { total_size: size });
            }
            Err(e) => return Err(TransferError::Storage(e)),
        };

        let download = Download {
            read,
            file_name,
            sha256: version.sha256,
        };
        if download.read.range.is_some() {
            Ok(ServeResult::Partial(download))
        } else {
            Ok(ServeResult::Full(download))
        }
    }
}
