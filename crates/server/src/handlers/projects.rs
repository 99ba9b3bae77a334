//! Project and version management endpoints.

use crate::error::{ApiError, ApiResult};
use crate::identity::Uploader;
use crate::state::AppState;
use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use depot_core::{ArtifactRef, Project, VersionRecord};
use depot_storage::ArtifactKey;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Request to create a project.
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

/// A project together with its versions, newest first.
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub versions: Vec<VersionRecord>,
}

/// GET /api/projects - List projects, newest first, with their versions.
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<ProjectDetail>>> {
    let projects = state.catalog.list_projects().await?;
    let mut details = Vec::with_capacity(projects.len());
    for project in projects {
        let versions = state.catalog.list_versions(project.id).await?;
        details.push(ProjectDetail { project, versions });
    }
    Ok(Json(details))
}

/// POST /api/projects - Create a project owned by the caller.
pub async fn create_project(
    State(state): State<AppState>,
    Extension(uploader): Extension<Uploader>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectDetail>)> {
    let project = Project::new(req.name, uploader.0)?;
    state.catalog.create_project(&project).await?;

    info!(
        project_id = %project.id,
        name = %project.name,
        owner = %project.owner,
        "Project created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ProjectDetail {
            project,
            versions: Vec::new(),
        }),
    ))
}

/// GET /api/projects/{project_id} - Get a project with its versions.
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ProjectDetail>> {
    let project_id = parse_id("project", &project_id)?;
    let project = state
        .catalog
        .find_project(project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {project_id} not found")))?;
    let versions = state.catalog.list_versions(project.id).await?;
    Ok(Json(ProjectDetail { project, versions }))
}

/// DELETE /api/projects/{project_id} - Delete a project, its versions and
/// its artifact directory.
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<StatusCode> {
    let project_id = parse_id("project", &project_id)?;
    let project = state
        .catalog
        .find_project(project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {project_id} not found")))?;

    state.catalog.delete_project(project.id).await?;

    if let Err(e) = state.storage.delete_project(&project.name).await {
        warn!(project = %project.name, error = %e, "Failed to remove project artifacts");
    }

    info!(project_id = %project.id, name = %project.name, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/projects/{project_id}/versions/{version_id} - Delete a version.
///
/// The record is removed first. Removing the stored artifact is best-effort:
/// a failure is logged and the request still succeeds.
pub async fn delete_version(
    State(state): State<AppState>,
    Path((project_id, version_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let project_id = parse_id("project", &project_id)?;
    let version_id = parse_id("version", &version_id)?;
    let project = state
        .catalog
        .find_project(project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {project_id} not found")))?;

    let record = state.catalog.delete_version(project.id, version_id).await?;

    if let Some(file_name) = record
        .artifact_ref
        .as_ref()
        .and_then(ArtifactRef::stored_file_name)
    {
        match ArtifactKey::new(project.name.as_str(), record.platform, file_name) {
            Ok(key) => {
                if let Err(e) = state.storage.delete(&key).await {
                    warn!(key = %key, error = %e, "Failed to remove version artifact");
                }
            }
            Err(e) => {
                warn!(file_name = %file_name, error = %e, "Version has an invalid artifact key")
            }
        }
    }

    info!(
        project = %project.name,
        version_id = %record.id,
        platform = %record.platform,
        version = %record.version,
        "Version deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

fn parse_id(kind: &str, value: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| ApiError::NotFound(format!("{kind} {value} not found")))
}
