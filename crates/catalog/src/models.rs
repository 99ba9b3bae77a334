//! Database rows and their conversion to domain types.

use crate::error::{CatalogError, CatalogResult};
use depot_core::{ArtifactRef, Platform, Project, VersionRecord};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

const ARTIFACT_STORED: &str = "stored";
const ARTIFACT_EXTERNAL: &str = "external";

/// Project row.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectRow {
    pub project_id: Uuid,
    pub name: String,
    pub owner: String,
    pub created_at: OffsetDateTime,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.project_id,
            name: row.name,
            owner: row.owner,
            created_at: row.created_at,
        }
    }
}

/// Version row. The artifact reference is split into a kind and a value.
#[derive(Debug, Clone, FromRow)]
pub struct VersionRow {
    pub version_id: Uuid,
    pub project_id: Uuid,
    pub platform: String,
    pub version: String,
    pub environment: String,
    pub notes: String,
    pub artifact_kind: Option<String>,
    pub artifact_value: Option<String>,
    pub size_bytes: Option<i64>,
    pub sha256: Option<String>,
    pub uploaded_by: String,
    pub uploaded_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

impl VersionRow {
    pub fn from_record(project_id: Uuid, record: &VersionRecord) -> CatalogResult<Self> {
        let (artifact_kind, artifact_value) = match &record.artifact_ref {
            Some(ArtifactRef::Stored { file_name }) => {
                (Some(ARTIFACT_STORED.to_string()), Some(file_name.clone()))
            }
            Some(ArtifactRef::External { url }) => {
                (Some(ARTIFACT_EXTERNAL.to_string()), Some(url.clone()))
            }
            None => (None, None),
        };
        let size_bytes = record
            .size_bytes
            .map(i64::try_from)
            .transpose()
            .map_err(|_| CatalogError::Internal("size_bytes out of range".to_string()))?;

        Ok(Self {
            version_id: record.id,
            project_id,
            platform: record.platform.as_str().to_string(),
            version: record.version.clone(),
            environment: record.environment.clone(),
            notes: record.notes.clone(),
            artifact_kind,
            artifact_value,
            size_bytes,
            sha256: record.sha256.clone(),
            uploaded_by: record.uploaded_by.clone(),
            uploaded_at: record.uploaded_at,
            updated_at: record.updated_at,
        })
    }
}

impl TryFrom<VersionRow> for VersionRecord {
    type Error = CatalogError;

    fn try_from(row: VersionRow) -> CatalogResult<Self> {
        let platform = Platform::parse(&row.platform)
            .map_err(|e| CatalogError::Internal(format!("version {}: {e}", row.version_id)))?;
        let artifact_ref = match (row.artifact_kind.as_deref(), row.artifact_value) {
            (Some(ARTIFACT_STORED), Some(file_name)) => Some(ArtifactRef::Stored { file_name }),
            (Some(ARTIFACT_EXTERNAL), Some(url)) => Some(ArtifactRef::External { url }),
            (None, _) => None,
            (Some(other), _) => {
                return Err(CatalogError::Internal(format!(
                    "version {}: unknown artifact kind '{other}'",
                    row.version_id
                )));
            }
        };
        let size_bytes = row
            .size_bytes
            .map(u64::try_from)
            .transpose()
            .map_err(|_| {
                CatalogError::Internal(format!("version {}: negative size", row.version_id))
            })?;

        Ok(VersionRecord {
            id: row.version_id,
            platform,
            version: row.version,
            environment: row.environment,
            notes: row.notes,
            artifact_ref,
            size_bytes,
            sha256: row.sha256,
            uploaded_by: row.uploaded_by,
            uploaded_at: row.uploaded_at,
            updated_at: row.updated_at,
        })
    }
}
