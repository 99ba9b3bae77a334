//! Ingest pipeline: validate an upload, copy its bytes into the artifact
//! store with progress reporting, and append the version to the catalog.

use crate::metrics;
use crate::transfer::error::{TransferError, TransferResult};
use crate::transfer::locks::VersionLocks;
use crate::transfer::progress::{self, ProgressReceiver, ProgressSender};
use depot_catalog::Catalog;
use depot_core::{
    ArtifactRef, ContentHash, MAX_ARTIFACT_SIZE, Platform, ProgressThrottle, Project,
    VersionRecord, has_allowed_extension, validate_name_component,
};
use depot_storage::{ArtifactKey, ArtifactStore, ByteStream, StagedFile, StreamingUpload};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;
use tracing::{Instrument, debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Bytes to ingest, with the length the client declared up front.
pub struct ArtifactSource {
    original_name: String,
    declared_length: u64,
    stream: ByteStream,
    staged: Option<StagedFile>,
}

impl ArtifactSource {
    pub fn from_stream(
        original_name: impl Into<String>,
        declared_length: u64,
        stream: ByteStream,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            declared_length,
            stream,
            staged: None,
        }
    }

    /// Read from a staged file. The file is discarded when the ingest ends.
    pub async fn from_staged(staged: StagedFile) -> depot_storage::StorageResult<Self> {
        let stream = staged.open().await?;
        Ok(Self {
            original_name: staged.original_name().to_string(),
            declared_length: staged.len(),
            stream,
            staged: Some(staged),
        })
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn declared_length(&self) -> u64 {
        self.declared_length
    }
}

impl std::fmt::Debug for ArtifactSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactSource")
            .field("original_name", &self.original_name)
            .field("declared_length", &self.declared_length)
            .field("staged", &self.staged)
            .finish_non_exhaustive()
    }
}

/// An upload as received. Fields are raw strings; validation happens in the pipeline.
#[derive(Debug, Default)]
pub struct UploadRequest {
    pub project_id: String,
    pub platform: String,
    pub version: String,
    pub environment: String,
    pub notes: String,
    pub source_url: Option<String>,
    pub source: Option<ArtifactSource>,
    pub uploaded_by: String,
}

/// Source stream detached from its staged file.
struct SourceBody {
    original_name: String,
    declared_length: u64,
    stream: ByteStream,
}

/// Validated request fields.
#[derive(Debug)]
struct Checked {
    project_id: Uuid,
    platform: Platform,
    version: String,
    environment: String,
    notes: String,
    url: Option<String>,
}

/// Runs uploads against a store and catalog.
#[derive(Clone)]
pub struct Ingest {
    storage: Arc<dyn ArtifactStore>,
    catalog: Arc<dyn Catalog>,
    locks: VersionLocks,
    size_limit: u64,
}

impl Ingest {
    pub fn new(
        storage: Arc<dyn ArtifactStore>,
        catalog: Arc<dyn Catalog>,
        locks: VersionLocks,
        size_limit: u64,
    ) -> Self {
        Self {
            storage,
            catalog,
            locks,
            size_limit: size_limit.min(MAX_ARTIFACT_SIZE),
        }
    }

    pub fn locks(&self) -> &VersionLocks {
        &self.locks
    }

    /// Spawn the ingest and return its event stream.
    pub fn start(&self, request: UploadRequest) -> ProgressReceiver {
        let (sender, receiver) = progress::channel();
        let ingest = self.clone();
        let span = tracing::Span::current();
        tokio::spawn(async move { ingest.run(request, sender).await }.instrument(span));
        receiver
    }

    /// Run an ingest to completion. Exactly one terminal event is sent.
    pub async fn run(&self, mut request: UploadRequest, sender: ProgressSender) {
        let started = Instant::now();
        metrics::UPLOADS_STARTED.inc();
        metrics::ACTIVE_INGESTS.inc();

        let (body, staged) = match request.source.take() {
            Some(source) => (
                Some(SourceBody {
                    original_name: source.original_name,
                    declared_length: source.declared_length,
                    stream: source.stream,
                }),
                source.staged,
            ),
            None => (None, None),
        };

        let result = self.execute(request, body, &sender).await;

        if let Some(staged) = staged {
            let path = staged.path().to_path_buf();
            if let Err(e) = staged.discard().await {
                warn!(path = %path.display(), error = %e, "Failed to discard staged upload");
            }
        }

        metrics::ACTIVE_INGESTS.dec();
        metrics::INGEST_DURATION.observe(started.elapsed().as_secs_f64());

        match result {
            Ok(record) => {
                let kind = match record.artifact_ref {
                    Some(ArtifactRef::External { .. }) => "external",
                    _ => "stored",
                };
                metrics::UPLOADS_COMPLETED.with_label_values(&[kind]).inc();
                if let Some(size) = record.size_bytes {
                    metrics::BYTES_INGESTED.inc_by(size);
                }
                info!(
                    version_id = %record.id,
                    platform = %record.platform,
                    version = %record.version,
                    size_bytes = ?record.size_bytes,
                    "Version published"
                );
                sender.complete(record);
            }
            Err(e) => {
                metrics::record_upload_failure(e.code());
                match &e {
                    TransferError::Storage(_) | TransferError::Catalog(_) => {
                        warn!(code = e.code(), error = %e, "Ingest failed")
                    }
                    _ => info!(code = e.code(), error = %e, "Ingest rejected"),
                }
                sender.fail(&e);
            }
        }
    }

    async fn execute(
        &self,
        request: UploadRequest,
        body: Option<SourceBody>,
        sender: &ProgressSender,
    ) -> TransferResult<VersionRecord> {
        let checked = self.validate(&request, body.as_ref())?;

        let project = self
            .catalog
            .find_project(checked.project_id)
            .await?
            .ok_or_else(|| {
                TransferError::NotFound(format!("project {} not found", checked.project_id))
            })?;

        let _reservation = self
            .locks
            .try_reserve(project.id, checked.platform, &checked.version)
            .ok_or_else(|| duplicate(&checked))?;
        if self
            .catalog
            .version_exists(project.id, checked.platform, &checked.version)
            .await?
        {
            return Err(duplicate(&checked));
        }

        let mut record = VersionRecord {
            id: Uuid::new_v4(),
            platform: checked.platform,
            version: checked.version.clone(),
            environment: checked.environment.clone(),
            notes: checked.notes.clone(),
            artifact_ref: None,
            size_bytes: None,
            sha256: None,
            uploaded_by: request.uploaded_by.clone(),
            uploaded_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };

        match (checked.url, body) {
            (Some(url), None) => {
                record.artifact_ref = Some(ArtifactRef::External { url });
                self.catalog.append_version(project.id, &record).await?;
                Ok(record)
            }
            (None, Some(body)) => {
                let key = ArtifactKey::for_upload(
                    project.name.as_str(),
                    checked.platform,
                    &checked.version,
                    &body.original_name,
                )?;
                let (size, hash) = self.store(&key, body, sender).await?;
                record.artifact_ref = Some(ArtifactRef::Stored {
                    file_name: key.file_name().to_string(),
                });
                record.size_bytes = Some(size);
                record.sha256 = Some(hash.to_hex());

                if let Err(e) = self.catalog.append_version(project.id, &record).await {
                    self.remove_orphan(&key, &project).await;
                    return Err(e.into());
                }
                Ok(record)
            }
            // validate() guarantees exactly one of the two.
            _ => Err(TransferError::Validation(
                "exactly one of url or file is required".to_string(),
            )),
        }
    }

    fn validate(
        &self,
        request: &UploadRequest,
        body: Option<&SourceBody>,
    ) -> TransferResult<Checked> {
        let project_id = required("projectId", &request.project_id)?;
        let platform = required("platform", &request.platform)?;
        let version = required("version", &request.version)?;
        let environment = required("environment", &request.environment)?;

        let project_id = Uuid::parse_str(project_id)
            .map_err(|_| TransferError::Validation(format!("invalid projectId: {project_id}")))?;
        let platform =
            Platform::parse(platform).map_err(|e| TransferError::Validation(e.to_string()))?;
        validate_name_component("version", version)
            .map_err(|e| TransferError::Validation(e.to_string()))?;

        let url = request
            .source_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());
        let mut external_url = None;

        if platform.is_url_backed() {
            if body.is_some() {
                return Err(TransferError::Validation(format!(
                    "{platform} builds are distributed by URL; file uploads are not accepted"
                )));
            }
            let Some(raw) = url else {
                return Err(TransferError::Validation(format!(
                    "url is required for {platform}"
                )));
            };
            external_url = Some(parse_external_url(raw)?);
        } else {
            if url.is_some() {
                return Err(TransferError::Validation(format!(
                    "{platform} builds require a file; url is not accepted"
                )));
            }
            let Some(body) = body else {
                return Err(TransferError::Validation(format!(
                    "file is required for {platform}"
                )));
            };
            validate_name_component("file name", &body.original_name)
                .map_err(|e| TransferError::Validation(e.to_string()))?;
            if !has_allowed_extension(&body.original_name) {
                return Err(TransferError::Validation(
                    depot_core::Error::InvalidFileType(body.original_name.clone()).to_string(),
                ));
            }
            if body.declared_length > self.size_limit {
                return Err(TransferError::Validation(format!(
                    "artifact of {} bytes exceeds the {} byte limit",
                    body.declared_length, self.size_limit
                )));
            }
        }

        Ok(Checked {
            project_id,
            platform,
            version: version.to_string(),
            environment: environment.to_string(),
            notes: request.notes.trim().to_string(),
            url: external_url,
        })
    }

    /// Copy the source into the store. On any failure the upload is aborted,
    /// so nothing is left at the key.
    async fn store(
        &self,
        key: &ArtifactKey,
        body: SourceBody,
        sender: &ProgressSender,
    ) -> TransferResult<(u64, ContentHash)> {
        let mut upload = self.storage.put_stream(key).await?;
        let copied = copy_with_progress(upload.as_mut(), body, sender).await;

        let hash = match copied {
            Ok(hash) => hash,
            Err(e) => {
                if let Err(abort_err) = upload.abort().await {
                    warn!(key = %key, error = %abort_err, "Failed to abort partial artifact");
                }
                return Err(e);
            }
        };

        let size = upload.finish().await?;
        debug!(key = %key, size, "Artifact published");
        Ok((size, hash))
    }

    async fn remove_orphan(&self, key: &ArtifactKey, project: &Project) {
        if let Err(e) = self.storage.delete(key).await {
            warn!(
                project = %project.name,
                key = %key,
                error = %e,
                "Failed to remove artifact after catalog append failed"
            );
        }
    }
}

async fn copy_with_progress(
    upload: &mut dyn StreamingUpload,
    body: SourceBody,
    sender: &ProgressSender,
) -> TransferResult<ContentHash> {
    let SourceBody {
        declared_length,
        mut stream,
        ..
    } = body;
    let mut throttle = ProgressThrottle::new(declared_length);
    let mut hasher = ContentHash::hasher();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let len = chunk.len() as u64;
        if throttle.transferred() + len > declared_length {
            return Err(TransferError::StreamAborted(format!(
                "source exceeded its declared length of {declared_length} bytes"
            )));
        }

        hasher.update(&chunk);
        upload.write(chunk).await?;

        if let Some(percent) = throttle.advance(len) {
            sender
                .progress(percent)
                .map_err(|e| TransferError::StreamAborted(e.to_string()))?;
        }
    }

    if throttle.transferred() != declared_length {
        return Err(TransferError::StreamAborted(format!(
            "source ended after {} of {declared_length} bytes",
            throttle.transferred()
        )));
    }
    Ok(hasher.finalize())
}

fn required<'a>(field: &str, value: &'a str) -> TransferResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TransferError::Validation(format!("{field} is required")));
    }
    Ok(value)
}

/// Accepts absolute http(s) URLs only and returns their normalized form, which
/// is always valid as a `Location` header.
fn parse_external_url(raw: &str) -> TransferResult<String> {
    let invalid =
        || TransferError::Validation(format!("url must be an absolute http(s) URL: {raw:?}"));

    // The parser silently strips tabs and newlines, so refuse them up front.
    if raw.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(invalid());
    }
    let parsed = Url::parse(raw).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid());
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid());
    }
    Ok(parsed.into())
}

fn duplicate(checked: &Checked) -> TransferError {
    TransferError::DuplicateVersion(format!(
        "version {} already exists for {}",
        checked.version, checked.platform
    ))
}
