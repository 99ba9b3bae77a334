//! Artifact addressing.

use crate::error::{StorageError, StorageResult};
use depot_core::{Platform, compose_file_name, validate_name_component};
use std::fmt;

/// Address of a stored artifact: `<project>/<platform>/<file_name>`.
///
/// Every component is validated on construction so a key can always be
/// joined onto a storage root without escaping it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    project: String,
    platform: Platform,
    file_name: String,
}

impl ArtifactKey {
    pub fn new(
        project: impl Into<String>,
        platform: Platform,
        file_name: impl Into<String>,
    ) -> StorageResult<Self> {
        let project = project.into();
        let file_name = file_name.into();
        validate_name_component("project name", &project)
            .map_err(|e| StorageError::InvalidKey(e.to_string()))?;
        validate_name_component("file name", &file_name)
            .map_err(|e| StorageError::InvalidKey(e.to_string()))?;
        Ok(Self {
            project,
            platform,
            file_name,
        })
    }

    /// Key for a new upload, named `{version}-{original_name}`.
    pub fn for_upload(
        project: impl Into<String>,
        platform: Platform,
        version: &str,
        original_name: &str,
    ) -> StorageResult<Self> {
        Self::new(project, platform, compose_file_name(version, original_name))
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Path relative to the storage root.
    pub fn relative_path(&self) -> String {
        format!("{}/{}/{}", self.project, self.platform, self.file_name)
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relative_path())
    }
}
