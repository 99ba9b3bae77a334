use depot_catalog::SqliteCatalog;
use depot_core::{ArtifactRef, Platform, VersionRecord};
use tempfile::TempDir;
use time::OffsetDateTime;
use uuid::Uuid;

/// A catalog in a temp directory. Keep the `TempDir` alive for the test.
pub async fn test_catalog() -> (TempDir, SqliteCatalog) {
    let dir = TempDir::new().unwrap();
    let catalog = SqliteCatalog::new(dir.path().join("catalog.db")).await.unwrap();
    (dir, catalog)
}

#[allow(dead_code)]
pub fn stored_version(platform: Platform, version: &str) -> VersionRecord {
    VersionRecord {
        id: Uuid::new_v4(),
        platform,
        version: version.to_string(),
        environment: "staging".to_string(),
        notes: String::new(),
        artifact_ref: Some(ArtifactRef::Stored {
            file_name: format!("{version}-app.apk"),
        }),
        size_bytes: Some(10),
        sha256: Some("0".repeat(64)),
        uploaded_by: "ci".to_string(),
        uploaded_at: OffsetDateTime::now_utc(),
        updated_at: None,
    }
}

#[allow(dead_code)]
pub fn external_version(platform: Platform, version: &str) -> VersionRecord {
    VersionRecord {
        artifact_ref: Some(ArtifactRef::External {
            url: format!("https://testflight.example/{version}"),
        }),
        size_bytes: None,
        sha256: None,
        ..stored_version(platform, version)
    }
}
