//! Local filesystem storage backend.
//!
//! Artifacts live at `<root>/<project>/<platform>/<file_name>`. Writes go to a
//! sibling temp file and are published with a hard link, which fails instead of
//! replacing an existing artifact.

use crate::error::{StorageError, StorageResult};
use crate::key::ArtifactKey;
use crate::traits::{ArtifactMeta, ArtifactRead, ArtifactStore, StreamingUpload};
use async_trait::async_trait;
use bytes::Bytes;
use depot_core::{ByteRange, TRANSFER_CHUNK_SIZE};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::instrument;
use uuid::Uuid;

/// Filesystem artifact store.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend, creating the root if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path beneath the root, off the async runtime.
    async fn resolve(&self, relative: String) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || Self::resolve_sync(&root, &relative))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }

    /// Join `relative` onto `root`, refusing anything that would land outside it.
    ///
    /// Existing paths are canonicalized so a symlink inside the root cannot point
    /// elsewhere. For paths that do not exist yet, the nearest existing ancestor
    /// is checked instead, so directories are never created through a symlink.
    fn resolve_sync(root: &Path, relative: &str) -> StorageResult<PathBuf> {
        let relative_path = Path::new(relative);
        if relative.is_empty()
            || relative_path
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(format!(
                "unsafe path component in {relative}"
            )));
        }

        let path = root.join(relative_path);
        let root_canonical = root.canonicalize().map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to canonicalize root: {e}"),
            ))
        })?;

        let mut probe = Some(path.as_path());
        while let Some(candidate) = probe {
            match std::fs::symlink_metadata(candidate) {
                Ok(meta) => {
                    let canonical = candidate.canonicalize().map_err(|e| {
                        if meta.file_type().is_symlink() {
                            StorageError::InvalidKey(format!(
                                "symlink target missing or invalid: {relative}"
                            ))
                        } else {
                            StorageError::Io(e)
                        }
                    })?;
                    if !canonical.starts_with(&root_canonical) {
                        return Err(StorageError::InvalidKey(format!(
                            "resolved path escapes storage root: {relative}"
                        )));
                    }
                    return Ok(path);
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    probe = candidate.parent();
                }
                Err(err) => return Err(StorageError::Io(err)),
            }
        }

        Ok(path)
    }

    async fn key_path(&self, key: &ArtifactKey) -> StorageResult<PathBuf> {
        self.resolve(key.relative_path()).await
    }

    async fn open(&self, key: &ArtifactKey) -> StorageResult<(fs::File, u64)> {
        let path = self.key_path(key).await?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| not_found_or_io(e, key))?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok((file, metadata.len()))
    }
}

fn not_found_or_io(e: std::io::Error, key: &ArtifactKey) -> StorageError {
    if e.kind() == ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::Io(e)
    }
}

#[async_trait]
impl ArtifactStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem", key = %key))]
    async fn exists(&self, key: &ArtifactKey) -> StorageResult<bool> {
        let path = self.key_path(key).await?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem", key = %key))]
    async fn head(&self, key: &ArtifactKey) -> StorageResult<ArtifactMeta> {
        let path = self.key_path(key).await?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| not_found_or_io(e, key))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(ArtifactMeta {
            size: metadata.len(),
            last_modified: metadata.modified().ok().map(|t| t.into()),
        })
    }

    #[instrument(skip(self), fields(backend = "filesystem", key = %key))]
    async fn get(
        &self,
        key: &ArtifactKey,
        range: Option<ByteRange>,
    ) -> StorageResult<ArtifactRead> {
        let (mut file, total_size) = self.open(key).await?;

        let resolved = match range {
            Some(range) => Some(
                range
                    .resolve(total_size)
                    .ok_or(StorageError::RangeNotSatisfiable { size: total_size })?,
            ),
            None => None,
        };

        let (offset, length) = match resolved {
            Some(r) => (r.start, r.len()),
            None => (0, total_size),
        };
        if offset > 0 {
            file.seek(std::io::SeekFrom::Start(offset)).await?;
        }

        let stream = async_stream::try_stream! {
            let mut reader = file.take(length);
            let mut buf = vec![0u8; TRANSFER_CHUNK_SIZE];
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                yield Bytes::copy_from_slice(&buf[..n]);
            }
        };

        Ok(ArtifactRead {
            stream: Box::pin(stream),
            total_size,
            range: resolved,
        })
    }

    #[instrument(skip(self), fields(backend = "filesystem", key = %key))]
    async fn put_stream(&self, key: &ArtifactKey) -> StorageResult<Box<dyn StreamingUpload>> {
        let path = self.key_path(key).await?;
        if fs::try_exists(&path).await? {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_file_name(format!("{}.tmp.{}", key.file_name(), Uuid::new_v4()));
        let file = fs::File::create(&temp_path).await?;

        Ok(Box::new(FilesystemUpload {
            file,
            temp_path,
            final_path: path,
            key: key.to_string(),
            bytes_written: 0,
        }))
    }

    #[instrument(skip(self), fields(backend = "filesystem", key = %key))]
    async fn delete(&self, key: &ArtifactKey) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_io(e, key))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete_project(&self, project: &str) -> StorageResult<()> {
        depot_core::validate_name_component("project name", project)
            .map_err(|e| StorageError::InvalidKey(e.to_string()))?;
        let path = self.resolve(project.to_string()).await?;
        match fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {e}"),
            ))
        })?;
        if !metadata.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                ErrorKind::NotADirectory,
                format!("storage root is not a directory: {:?}", self.root),
            )));
        }
        Ok(())
    }
}

/// Streaming upload into a temp file next to the final path.
struct FilesystemUpload {
    file: fs::File,
    temp_path: PathBuf,
    final_path: PathBuf,
    key: String,
    bytes_written: u64,
}

#[async_trait]
impl StreamingUpload for FilesystemUpload {
    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        self.file.write_all(&data).await?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    async fn finish(self: Box<Self>) -> StorageResult<u64> {
        let Self {
            file,
            temp_path,
            final_path,
            key,
            bytes_written,
        } = *self;

        if let Err(e) = file.sync_all().await {
            drop(file);
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }
        drop(file);

        // hard_link never replaces an existing file, unlike rename.
        let linked = fs::hard_link(&temp_path, &final_path).await;
        let _ = fs::remove_file(&temp_path).await;
        match linked {
            Ok(()) => Ok(bytes_written),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(key))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        drop(self.file);
        match fs::remove_file(&self.temp_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::Platform;
    use futures::TryStreamExt;

    fn key(file: &str) -> ArtifactKey {
        ArtifactKey::new("Mercury", Platform::Android, file).unwrap()
    }

    async fn read_all(read: ArtifactRead) -> Vec<u8> {
        let chunks: Vec<Bytes> = read.stream.try_collect().await.unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();
        let key = key("1.0-app.apk");

        let mut upload = backend.put_stream(&key).await.unwrap();
        upload.write(Bytes::from_static(b"hello ")).await.unwrap();
        upload.write(Bytes::from_static(b"world")).await.unwrap();
        assert_eq!(upload.finish().await.unwrap(), 11);

        assert!(backend.exists(&key).await.unwrap());
        assert!(dir.path().join("Mercury/android/1.0-app.apk").is_file());
        let read = backend.get(&key, None).await.unwrap();
        assert_eq!(read.total_size, 11);
        assert_eq!(read_all(read).await, b"hello world");
    }

    #[tokio::test]
    async fn test_ranged_get() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();
        let key = key("1.0-app.apk");
        let mut upload = backend.put_stream(&key).await.unwrap();
        upload.write(Bytes::from_static(b"0123456789")).await.unwrap();
        upload.finish().await.unwrap();

        let read = backend
            .get(&key, ByteRange::parse("bytes=2-5"))
            .await
            .unwrap();
        assert_eq!(read.content_length(), 4);
        assert_eq!(read_all(read).await, b"2345");

        let read = backend
            .get(&key, ByteRange::parse("bytes=-3"))
            .await
            .unwrap();
        assert_eq!(read_all(read).await, b"789");

        let err = backend
            .get(&key, ByteRange::parse("bytes=10-"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::RangeNotSatisfiable { size: 10 }));
    }

    #[tokio::test]
    async fn test_finish_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();
        let key = key("1.0-app.apk");

        let mut first = backend.put_stream(&key).await.unwrap();
        let mut second = backend.put_stream(&key).await.unwrap();
        first.write(Bytes::from_static(b"first")).await.unwrap();
        second.write(Bytes::from_static(b"second")).await.unwrap();
        first.finish().await.unwrap();

        let err = second.finish().await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        let read = backend.get(&key, None).await.unwrap();
        assert_eq!(read_all(read).await, b"first");

        // no temp files left behind
        let entries = std::fs::read_dir(dir.path().join("Mercury/android")).unwrap();
        assert_eq!(entries.count(), 1);
    }

    #[tokio::test]
    async fn test_abort_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();
        let key = key("1.0-app.apk");

        let mut upload = backend.put_stream(&key).await.unwrap();
        upload.write(Bytes::from_static(b"partial")).await.unwrap();
        upload.abort().await.unwrap();

        assert!(!backend.exists(&key).await.unwrap());
        let entries = std::fs::read_dir(dir.path().join("Mercury/android")).unwrap();
        assert_eq!(entries.count(), 0);
    }

    #[tokio::test]
    async fn test_delete_project_removes_tree() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();
        let key = key("1.0-app.apk");
        let mut upload = backend.put_stream(&key).await.unwrap();
        upload.write(Bytes::from_static(b"x")).await.unwrap();
        upload.finish().await.unwrap();

        backend.delete_project("Mercury").await.unwrap();
        assert!(!dir.path().join("Mercury").exists());
        // Missing project is fine.
        backend.delete_project("Mercury").await.unwrap();
        assert!(backend.delete_project("..").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();
        let key = key("9.9-gone.apk");

        assert!(!backend.exists(&key).await.unwrap());
        assert!(matches!(
            backend.get(&key, None).await.unwrap_err(),
            StorageError::NotFound(_)
        ));
        assert!(matches!(
            backend.delete(&key).await.unwrap_err(),
            StorageError::NotFound(_)
        ));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_symlinked_project_rejected() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();
        symlink(outside.path(), dir.path().join("Mercury")).unwrap();

        let err = match backend.put_stream(&key("1.0-app.apk")).await {
            Err(e) => e,
            Ok(_) => panic!("expected InvalidKey for a symlinked project directory"),
        };
        assert!(matches!(err, StorageError::InvalidKey(_)), "{err:?}");
        assert!(!outside.path().join("android").exists());
    }
}
