//! Catalog trait and the SQLite implementation.

use crate::error::{CatalogError, CatalogResult};
use crate::repos::{ProjectRepo, VersionRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined catalog trait.
#[async_trait]
pub trait Catalog: ProjectRepo + VersionRepo + Send + Sync {
    /// Create tables and indexes if they do not exist.
    async fn migrate(&self) -> CatalogResult<()>;

    /// Check database connectivity.
    async fn health_check(&self) -> CatalogResult<()>;
}

/// SQLite-backed catalog.
pub struct SqliteCatalog {
    pool: Pool<Sqlite>,
}

impl SqliteCatalog {
    /// Open (or create) the database at `path` and apply the schema.
    pub async fn new(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // A single connection serializes writers, so appends never see "database is locked".
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let catalog = Self { pool };
        catalog.migrate().await?;
        tracing::debug!(path = %path.display(), "Opened SQLite catalog");
        Ok(catalog)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn migrate(&self) -> CatalogResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> CatalogResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

mod sqlite_impl {
    use super::*;
    use crate::models::{ProjectRow, VersionRow};
    use depot_core::{Platform, Project, VersionRecord};
    use uuid::Uuid;

    #[async_trait]
    impl ProjectRepo for SqliteCatalog {
        async fn create_project(&self, project: &Project) -> CatalogResult<()> {
            let result = sqlx::query(
                "INSERT INTO projects (project_id, name, owner, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(project.id)
            .bind(&project.name)
            .bind(&project.owner)
            .bind(project.created_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                    CatalogError::AlreadyExists(format!("project '{}'", project.name)),
                ),
                Err(e) => Err(e.into()),
            }
        }

        async fn find_project(&self, project_id: Uuid) -> CatalogResult<Option<Project>> {
            let row =
                sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects WHERE project_id = ?")
                    .bind(project_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row.map(Project::from))
        }

        async fn project_exists(&self, project_id: Uuid) -> CatalogResult<bool> {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE project_id = ?)")
                    .bind(project_id)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(exists)
        }

        async fn list_projects(&self) -> CatalogResult<Vec<Project>> {
            let rows = sqlx::query_as::<_, ProjectRow>(
                "SELECT * FROM projects ORDER BY created_at DESC, rowid DESC",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows.into_iter().map(Project::from).collect())
        }

        async fn delete_project(&self, project_id: Uuid) -> CatalogResult<()> {
            let mut tx = self.pool.begin().await?;

            sqlx::query("DELETE FROM versions WHERE project_id = ?")
                .bind(project_id)
                .execute(&mut *tx)
                .await?;
            let result = sqlx::query("DELETE FROM projects WHERE project_id = ?")
                .bind(project_id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(CatalogError::NotFound(format!("project {project_id}")));
            }

            tx.commit().await?;
            Ok(())
        }
    }

    #[async_trait]
    impl VersionRepo for SqliteCatalog {
        async fn find_version(
            &self,
            project_id: Uuid,
            version_id: Uuid,
        ) -> CatalogResult<Option<VersionRecord>> {
            let row = sqlx::query_as::<_, VersionRow>(
                "SELECT * FROM versions WHERE project_id = ? AND version_id = ?",
            )
            .bind(project_id)
            .bind(version_id)
            .fetch_optional(&self.pool)
            .await?;
            row.map(VersionRecord::try_from).transpose()
        }

        async fn version_exists(
            &self,
            project_id: Uuid,
            platform: Platform,
            version: &str,
        ) -> CatalogResult<bool> {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM versions WHERE project_id = ? AND platform = ? AND version = ?)",
            )
            .bind(project_id)
            .bind(platform.as_str())
            .bind(version)
            .fetch_one(&self.pool)
            .await?;
            Ok(exists)
        }

        async fn append_version(
            &self,
            project_id: Uuid,
            record: &VersionRecord,
        ) -> CatalogResult<()> {
            let row = VersionRow::from_record(project_id, record)?;
            let result = sqlx::query(
                r#"
                INSERT INTO versions (
                    version_id, project_id, platform, version, environment, notes,
                    artifact_kind, artifact_value, size_bytes, sha256,
                    uploaded_by, uploaded_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(row.version_id)
            .bind(row.project_id)
            .bind(&row.platform)
            .bind(&row.version)
            .bind(&row.environment)
            .bind(&row.notes)
            .bind(&row.artifact_kind)
            .bind(&row.artifact_value)
            .bind(row.size_bytes)
            .bind(&row.sha256)
            .bind(&row.uploaded_by)
            .bind(row.uploaded_at)
            .bind(row.updated_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    Err(CatalogError::AlreadyExists(format!(
                        "version {} for {} in project {project_id}",
                        record.version, record.platform
                    )))
                }
                Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                    Err(CatalogError::NotFound(format!("project {project_id}")))
                }
                Err(e) => Err(e.into()),
            }
        }

        async fn list_versions(&self, project_id: Uuid) -> CatalogResult<Vec<VersionRecord>> {
            let rows = sqlx::query_as::<_, VersionRow>(
                "SELECT * FROM versions WHERE project_id = ? ORDER BY uploaded_at DESC, rowid DESC",
            )
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
            rows.into_iter().map(VersionRecord::try_from).collect()
        }

        async fn delete_version(
            &self,
            project_id: Uuid,
            version_id: Uuid,
        ) -> CatalogResult<VersionRecord> {
            let mut tx = self.pool.begin().await?;

            let row = sqlx::query_as::<_, VersionRow>(
                "SELECT * FROM versions WHERE project_id = ? AND version_id = ?",
            )
            .bind(project_id)
            .bind(version_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("version {version_id}")))?;

            sqlx::query("DELETE FROM versions WHERE version_id = ?")
                .bind(version_id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            VersionRecord::try_from(row)
        }
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    project_id BLOB PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    owner TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS versions (
    version_id BLOB PRIMARY KEY,
    project_id BLOB NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    platform TEXT NOT NULL,
    version TEXT NOT NULL,
    environment TEXT NOT NULL,
    notes TEXT NOT NULL DEFAULT '',
    artifact_kind TEXT,
    artifact_value TEXT,
    size_bytes INTEGER,
    sha256 TEXT,
    uploaded_by TEXT NOT NULL,
    uploaded_at TEXT NOT NULL,
    updated_at TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_versions_project_platform_version
    ON versions (project_id, platform, version);

CREATE INDEX IF NOT EXISTS idx_versions_project_uploaded
    ON versions (project_id, uploaded_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::{ArtifactRef, Platform, Project, VersionRecord};
    use time::OffsetDateTime;
    use uuid::Uuid;

    async fn catalog() -> (tempfile::TempDir, SqliteCatalog) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = SqliteCatalog::new(dir.path().join("catalog.db")).await.unwrap();
        (dir, catalog)
    }

    fn version(platform: Platform, version: &str) -> VersionRecord {
        VersionRecord {
            id: Uuid::new_v4(),
            platform,
            version: version.to_string(),
            environment: "production".to_string(),
            notes: "first cut".to_string(),
            artifact_ref: Some(ArtifactRef::Stored {
                file_name: format!("{version}-app.apk"),
            }),
            size_bytes: Some(1024),
            sha256: None,
            uploaded_by: "alice".to_string(),
            uploaded_at: OffsetDateTime::now_utc(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let (_dir, catalog) = catalog().await;
        catalog.migrate().await.unwrap();
        catalog.migrate().await.unwrap();
        catalog.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicate_version() {
        let (_dir, catalog) = catalog().await;
        let project = Project::new("Mercury", "alice").unwrap();
        catalog.create_project(&project).await.unwrap();

        catalog
            .append_version(project.id, &version(Platform::Android, "1.0"))
            .await
            .unwrap();
        let err = catalog
            .append_version(project.id, &version(Platform::Android, "1.0"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyExists(_)), "{err:?}");

        // Same version on another platform is a different triple.
        catalog
            .append_version(project.id, &version(Platform::Huawei, "1.0"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_append_to_missing_project_is_not_found() {
        let (_dir, catalog) = catalog().await;
        let err = catalog
            .append_version(Uuid::new_v4(), &version(Platform::Android, "1.0"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)), "{err:?}");
    }
}
