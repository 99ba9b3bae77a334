//! Staging area for incoming uploads.
//!
//! The HTTP layer spools a multipart file part here before the ingest pipeline
//! copies it into the artifact store. Staged files are transient: they are
//! discarded once ingest finishes, and anything left over from a previous run
//! is removed by [`StagingArea::purge`].

use crate::error::{StorageError, StorageResult};
use crate::traits::ByteStream;
use bytes::Bytes;
use depot_core::TRANSFER_CHUNK_SIZE;
use futures::{Stream, StreamExt};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Directory holding transient upload sources.
#[derive(Clone, Debug)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub async fn new(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `source` to a new staged file, refusing more than `limit` bytes.
    ///
    /// The source may borrow from the request (a multipart field, for example).
    /// On any failure the partial file is removed, and so it is when the
    /// returned future is dropped before completing.
    #[instrument(skip(self, source), fields(original_name = %original_name))]
    pub async fn spool<S>(
        &self,
        original_name: &str,
        source: S,
        limit: u64,
    ) -> StorageResult<StagedFile>
    where
        S: Stream<Item = StorageResult<Bytes>>,
    {
        let mut source = std::pin::pin!(source);
        let path = self.dir.join(format!("{}.upload", Uuid::new_v4()));
        // Declared before the file handle so the handle closes first on drop.
        let guard = StagingGuard::new(path.clone());
        let mut file = fs::File::create(&path).await?;

        let mut size: u64 = 0;
        while let Some(chunk) = source.next().await {
            let chunk = chunk?;
            size += chunk.len() as u64;
            if size > limit {
                return Err(StorageError::TooLarge { limit });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        debug!(path = %path.display(), size, "Staged upload");
        Ok(StagedFile {
            path,
            original_name: original_name.to_string(),
            size,
            guard,
        })
    }

    /// Remove every file in the staging directory. Returns how many were removed.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub async fn purge(&self) -> StorageResult<usize> {
        let mut removed = 0;
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StorageError::Io(e)),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Deletes a staging file when dropped unless disarmed.
///
/// Covers every early exit of a spool, including the request future being
/// dropped when the client disconnects.
#[derive(Debug)]
struct StagingGuard {
    path: Option<PathBuf>,
}

impl StagingGuard {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn disarm(&mut self) {
        self.path = None;
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Removed abandoned staged upload"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove abandoned staged upload"
                ),
            }
        }
    }
}

/// A fully received upload waiting to be ingested.
///
/// Dropping it without calling [`StagedFile::discard`] still removes the file.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    original_name: String,
    size: u64,
    guard: StagingGuard,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name as supplied by the client.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Open the staged bytes as a chunked stream.
    pub async fn open(&self) -> StorageResult<ByteStream> {
        let file = fs::File::open(&self.path).await?;
        let stream = ReaderStream::with_capacity(file, TRANSFER_CHUNK_SIZE)
            .map(|chunk| chunk.map_err(StorageError::Io));
        Ok(Box::pin(stream))
    }

    /// Delete the staged file. Already-removed files are not an error.
    pub async fn discard(mut self) -> StorageResult<()> {
        self.guard.disarm();
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
