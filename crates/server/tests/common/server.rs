//! Server test utilities.

use bytes::Bytes;
use depot_catalog::{Catalog, SqliteCatalog};
use depot_core::config::AppConfig;
use depot_core::{Platform, Project, TransferProgressEvent, VersionRecord};
use depot_server::transfer::{ArtifactSource, UploadRequest, progress};
use depot_server::{AppState, create_router};
use depot_storage::{ArtifactStore, FilesystemBackend, StagingArea};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use super::fixtures::byte_stream;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary storage.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server, adjusting the default test config first.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let mut config = AppConfig::for_testing(temp_dir.path());
        adjust(&mut config);

        let storage: Arc<dyn ArtifactStore> = Arc::new(
            FilesystemBackend::new(temp_dir.path().join("projects"))
                .await
                .expect("Failed to create storage backend"),
        );
        let catalog: Arc<dyn Catalog> = Arc::new(
            SqliteCatalog::new(temp_dir.path().join("catalog.db"))
                .await
                .expect("Failed to create catalog"),
        );
        let staging = StagingArea::new(temp_dir.path().join("staging"))
            .await
            .expect("Failed to create staging area");

        let state = AppState::new(config, storage, catalog, staging);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    pub fn storage_root(&self) -> PathBuf {
        self._temp_dir.path().join("projects")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self._temp_dir.path().join("staging")
    }

    /// Insert a project straight into the catalog.
    pub async fn create_project(&self, name: &str) -> Project {
        let project = Project::new(name, "tester").expect("valid project name");
        self.state
            .catalog
            .create_project(&project)
            .await
            .expect("Failed to create project");
        project
    }

    /// Build a file upload request for `project`.
    pub fn file_request(
        &self,
        project: &Project,
        platform: Platform,
        version: &str,
        file_name: &str,
        data: Bytes,
        chunk_size: usize,
    ) -> UploadRequest {
        let len = data.len() as u64;
        UploadRequest {
            project_id: project.id.to_string(),
            platform: platform.as_str().to_string(),
            version: version.to_string(),
            environment: "staging".to_string(),
            notes: "test build".to_string(),
            source: Some(ArtifactSource::from_stream(
                file_name,
                len,
                byte_stream(data, chunk_size),
            )),
            uploaded_by: "tester".to_string(),
            ..Default::default()
        }
    }

    /// Build a URL upload request for `project`.
    pub fn url_request(
        &self,
        project: &Project,
        platform: Platform,
        version: &str,
        url: &str,
    ) -> UploadRequest {
        UploadRequest {
            project_id: project.id.to_string(),
            platform: platform.as_str().to_string(),
            version: version.to_string(),
            environment: "production".to_string(),
            source_url: Some(url.to_string()),
            uploaded_by: "tester".to_string(),
            ..Default::default()
        }
    }

    /// Run an ingest to completion and return every event it emitted.
    pub async fn ingest(&self, request: UploadRequest) -> Vec<TransferProgressEvent> {
        let (sender, receiver) = progress::channel();
        self.state.ingest.run(request, sender).await;
        receiver.collect().await
    }

    /// Upload `data` and return the published record.
    pub async fn publish(
        &self,
        project: &Project,
        platform: Platform,
        version: &str,
        data: Bytes,
    ) -> VersionRecord {
        let request = self.file_request(project, platform, version, "app.apk", data, 64 * 1024);
        match self.ingest(request).await.pop() {
            Some(TransferProgressEvent::Completed { result }) => result,
            other => panic!("expected completed event, got {other:?}"),
        }
    }

    pub fn download_uri(&self, project: &Project, version_id: uuid::Uuid) -> String {
        format!("/api/download/{}/{}", project.id, version_id)
    }
}

/// Progress percents in emission order.
#[allow(dead_code)]
pub fn percents(events: &[TransferProgressEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            TransferProgressEvent::Progress { percent } => Some(*percent),
            _ => None,
        })
        .collect()
}

/// The terminal event's failure code, if it failed.
#[allow(dead_code)]
pub fn failure_code(events: &[TransferProgressEvent]) -> Option<&str> {
    match events.last() {
        Some(TransferProgressEvent::Failed { code, .. }) => Some(code.as_str()),
        _ => None,
    }
}
