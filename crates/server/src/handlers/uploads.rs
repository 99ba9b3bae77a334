//! Upload endpoint.
//!
//! The multipart body is read in full before the ingest starts: text fields
//! fill in the [`UploadRequest`], the `file` part is spooled to the staging
//! area. The response is a Server-Sent Events stream carrying the ingest's
//! progress and its single terminal event.

use crate::error::{ApiError, ApiResult};
use crate::identity::Uploader;
use crate::state::AppState;
use crate::transfer::{ArtifactSource, TransferError, UploadRequest};
use axum::Extension;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::http::header::CONTENT_LENGTH;
use axum::response::sse::{Event, KeepAlive, Sse};
use depot_core::{TransferProgressEvent, has_allowed_extension};
use depot_storage::{StagedFile, StorageError};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use tracing::{debug, warn};

/// Slack allowed on top of the artifact ceiling for multipart framing and
/// the text fields.
pub const MULTIPART_ALLOWANCE: u64 = 1024 * 1024;

/// POST /api/upload - Upload a version and stream its progress.
pub async fn upload(
    State(state): State<AppState>,
    Extension(uploader): Extension<Uploader>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let limit = state.size_limit();
    if let Some(length) = declared_content_length(&headers)
        && length > limit.saturating_add(MULTIPART_ALLOWANCE)
    {
        return Err(ApiError::PayloadTooLarge { limit });
    }

    let mut request = UploadRequest {
        uploaded_by: uploader.0,
        ..Default::default()
    };
    let mut staged: Option<StagedFile> = None;

    if let Err(e) = read_form(&state, &mut multipart, &mut request, &mut staged).await {
        if let Some(staged) = staged {
            discard(staged).await;
        }
        return Err(e);
    }

    // A staged file dropped on the error path removes itself.
    if let Some(staged) = staged {
        request.source = Some(ArtifactSource::from_staged(staged).await?);
    }

    debug!(
        project_id = %request.project_id,
        platform = %request.platform,
        version = %request.version,
        has_file = request.source.is_some(),
        "Upload received, starting ingest"
    );

    let events = state
        .ingest
        .start(request)
        .into_stream()
        .map(|event| Ok::<_, Infallible>(to_sse(&event)));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn read_form(
    state: &AppState,
    multipart: &mut Multipart,
    request: &mut UploadRequest,
    staged: &mut Option<StagedFile>,
) -> ApiResult<()> {
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                if staged.is_some() {
                    return Err(ApiError::BadRequest("only one file part is allowed".to_string()));
                }
                *staged = Some(spool_file(state, field).await?);
            }
            "projectId" => request.project_id = field.text().await.map_err(malformed)?,
            "platform" => request.platform = field.text().await.map_err(malformed)?,
            "version" => request.version = field.text().await.map_err(malformed)?,
            "environment" => request.environment = field.text().await.map_err(malformed)?,
            "notes" => request.notes = field.text().await.map_err(malformed)?,
            "url" => request.source_url = Some(field.text().await.map_err(malformed)?),
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }
    Ok(())
}

async fn spool_file(state: &AppState, field: Field<'_>) -> ApiResult<StagedFile> {
    let file_name = field.file_name().unwrap_or_default().trim().to_string();
    if file_name.is_empty() {
        return Err(ApiError::BadRequest("file part has no file name".to_string()));
    }
    if !has_allowed_extension(&file_name) {
        return Err(depot_core::Error::InvalidFileType(file_name).into());
    }

    let limit = state.size_limit();
    let source = field.map(|chunk| chunk.map_err(|e| StorageError::Interrupted(e.body_text())));
    match state.staging.spool(&file_name, source, limit).await {
        Ok(staged) => Ok(staged),
        Err(StorageError::TooLarge { limit }) => Err(ApiError::PayloadTooLarge { limit }),
        Err(e) if e.is_source_error() => Err(TransferError::from(e).into()),
        Err(e) => Err(e.into()),
    }
}

fn declared_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn malformed(e: MultipartError) -> ApiError {
    ApiError::BadRequest(format!("malformed multipart body: {}", e.body_text()))
}

async fn discard(staged: StagedFile) {
    let path = staged.path().to_path_buf();
    if let Err(e) = staged.discard().await {
        warn!(path = %path.display(), error = %e, "Failed to discard staged upload");
    }
}

fn to_sse(event: &TransferProgressEvent) -> Event {
    match Event::default().event(event.kind()).json_data(event) {
        Ok(sse) => sse,
        Err(e) => {
            warn!(error = %e, kind = event.kind(), "Failed to encode progress event");
            Event::default().event(event.kind()).data("{}")
        }
    }
}
