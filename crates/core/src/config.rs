//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    /// When enabled, restrict access to the endpoint at the network level.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Request header carrying the uploader's identity, set by a trusted
    /// reverse proxy. Requests without it are attributed to "anonymous".
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
    /// Browser origin allowed to call the API cross-origin (e.g. the web UI).
    /// CORS is disabled when unset.
    #[serde(default)]
    pub cors_origin: Option<String>,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_identity_header() -> String {
    "x-forwarded-user".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
            identity_header: default_identity_header(),
            cors_origin: None,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.identity_header.trim().is_empty() {
            return Err("server.identity_header cannot be empty".to_string());
        }
        if self
            .identity_header
            .bytes()
            .any(|b| !(b.is_ascii_alphanumeric() || b == b'-' || b == b'_'))
        {
            return Err(format!(
                "server.identity_header is not a valid header name: {}",
                self.identity_header
            ));
        }
        Ok(())
    }
}

/// Artifact storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory holding `<project>/<platform>/<file>` artifacts.
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/projects"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::Filesystem { path } if path.as_os_str().is_empty() => {
                Err("filesystem storage requires a non-empty path".to_string())
            }
            StorageConfig::Filesystem { .. } => Ok(()),
        }
    }
}

/// Catalog (project and version records) configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CatalogConfig {
    /// SQLite database file.
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/catalog.db"),
        }
    }
}

/// Upload ingestion configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory incoming multipart file parts are spooled into before ingest.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    /// Maximum artifact size in bytes. Values above 2 GiB are capped.
    #[serde(default = "default_max_artifact_size")]
    pub max_artifact_size: u64,
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("./data/staging")
}

fn default_max_artifact_size() -> u64 {
    crate::MAX_ARTIFACT_SIZE
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            max_artifact_size: default_max_artifact_size(),
        }
    }
}

impl UploadConfig {
    /// Effective size ceiling, never above [`crate::MAX_ARTIFACT_SIZE`].
    pub fn size_limit(&self) -> u64 {
        self.max_artifact_size.min(crate::MAX_ARTIFACT_SIZE)
    }

    /// Validate upload configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_artifact_size == 0 {
            return Err("upload.max_artifact_size must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Artifact storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Catalog configuration.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Upload configuration.
    #[serde(default)]
    pub upload: UploadConfig,
}

impl AppConfig {
    /// Create a test configuration rooted in `dir`.
    ///
    /// **For testing only.** Uses filesystem storage, a SQLite catalog and a
    /// staging directory all beneath the given directory.
    pub fn for_testing(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::Filesystem {
                path: dir.join("projects"),
            },
            catalog: CatalogConfig::Sqlite {
                path: dir.join("catalog.db"),
            },
            upload: UploadConfig {
                staging_dir: dir.join("staging"),
                ..UploadConfig::default()
            },
        }
    }

    /// Validate every section, returning the first error.
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.storage.validate()?;
        self.upload.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Figment;
    use figment::providers::{Format, Toml};

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: AppConfig = Figment::from(Toml::string("")).extract().unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert!(config.server.metrics_enabled);
        assert_eq!(config.server.identity_header, "x-forwarded-user");
        assert_eq!(config.upload.size_limit(), crate::MAX_ARTIFACT_SIZE);
        assert!(matches!(config.storage, StorageConfig::Filesystem { .. }));
        assert!(matches!(config.catalog, CatalogConfig::Sqlite { .. }));
        config.validate().unwrap();
    }

    #[test]
    fn test_toml_sections_override_defaults() {
        let toml = r#"
            [server]
            bind = "0.0.0.0:9000"
            cors_origin = "http://localhost:3000"

            [storage]
            type = "filesystem"
            path = "/srv/depot/projects"

            [upload]
            max_artifact_size = 1048576
        "#;
        let config: AppConfig = Figment::from(Toml::string(toml)).extract().unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(
            config.server.cors_origin.as_deref(),
            Some("http://localhost:3000")
        );
        match &config.storage {
            StorageConfig::Filesystem { path } => {
                assert_eq!(path, &PathBuf::from("/srv/depot/projects"))
            }
        }
        assert_eq!(config.upload.size_limit(), 1048576);
    }

    #[test]
    fn test_size_limit_is_capped() {
        let upload = UploadConfig {
            max_artifact_size: u64::MAX,
            ..UploadConfig::default()
        };
        assert_eq!(upload.size_limit(), crate::MAX_ARTIFACT_SIZE);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::for_testing("/tmp/depot");
        config.server.identity_header = "x user".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::for_testing("/tmp/depot");
        config.upload.max_artifact_size = 0;
        assert!(config.validate().is_err());

        let config = AppConfig::for_testing("/tmp/depot");
        config.validate().unwrap();
    }
}
