//! Storage trait definitions.

use crate::error::StorageResult;
use crate::key::ArtifactKey;
use async_trait::async_trait;
use bytes::Bytes;
use depot_core::{ByteRange, ResolvedRange};
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// A boxed stream of bytes for streaming reads and writes.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Metadata about a stored artifact.
#[derive(Clone, Debug)]
pub struct ArtifactMeta {
    /// Artifact size in bytes.
    pub size: u64,
    /// Last modification time (if available).
    pub last_modified: Option<time::OffsetDateTime>,
}

/// An open read of an artifact.
pub struct ArtifactRead {
    /// The requested bytes: the whole file, or only the resolved range.
    pub stream: ByteStream,
    /// Size of the whole file, regardless of the range.
    pub total_size: u64,
    /// The slice being returned, when a range was requested.
    pub range: Option<ResolvedRange>,
}

impl ArtifactRead {
    /// Number of bytes the stream will yield.
    pub fn content_length(&self) -> u64 {
        self.range.map_or(self.total_size, |r| r.len())
    }
}

impl std::fmt::Debug for ArtifactRead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactRead")
            .field("total_size", &self.total_size)
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

/// Durable artifact storage keyed by (project, platform, file name).
#[async_trait]
pub trait ArtifactStore: Send + Sync + 'static {
    /// Check if an artifact exists.
    async fn exists(&self, key: &ArtifactKey) -> StorageResult<bool>;

    /// Get an artifact's size without reading content.
    async fn head(&self, key: &ArtifactKey) -> StorageResult<ArtifactMeta>;

    /// Open an artifact for reading, optionally restricted to a byte range.
    ///
    /// The range is resolved against the size of the file actually opened.
    /// An unsatisfiable range yields [`crate::StorageError::RangeNotSatisfiable`].
    async fn get(&self, key: &ArtifactKey, range: Option<ByteRange>)
    -> StorageResult<ArtifactRead>;

    /// Start a streaming write. Nothing is visible at the key until `finish`.
    async fn put_stream(&self, key: &ArtifactKey) -> StorageResult<Box<dyn StreamingUpload>>;

    /// Stream `source` into a new artifact and return the bytes written.
    ///
    /// Fails with `AlreadyExists` rather than overwriting. On any error the
    /// partial upload is aborted, so no file is left at the key.
    async fn put(&self, key: &ArtifactKey, mut source: ByteStream) -> StorageResult<u64> {
        let mut upload = self.put_stream(key).await?;
        while let Some(chunk) = source.next().await {
            let written = match chunk {
                Ok(chunk) => upload.write(chunk).await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                if let Err(abort_err) = upload.abort().await {
                    tracing::warn!(
                        key = %key,
                        error = %abort_err,
                        "Failed to abort partial upload"
                    );
                }
                return Err(e);
            }
        }
        upload.finish().await
    }

    /// Delete an artifact.
    async fn delete(&self, key: &ArtifactKey) -> StorageResult<()>;

    /// Delete every artifact belonging to a project. Missing projects are not an error.
    async fn delete_project(&self, project: &str) -> StorageResult<()>;

    /// Get the name of this storage backend, used for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is reachable and correctly configured.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Trait for streaming uploads.
#[async_trait]
pub trait StreamingUpload: Send {
    /// Write a chunk of data.
    async fn write(&mut self, data: Bytes) -> StorageResult<()>;

    /// Bytes written so far.
    fn bytes_written(&self) -> u64;

    /// Publish the artifact and return the total bytes written.
    async fn finish(self: Box<Self>) -> StorageResult<u64>;

    /// Abort the upload, discarding everything written.
    async fn abort(self: Box<Self>) -> StorageResult<()>;
}
