//! Version records and artifact naming.

use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Maximum length of a single name component (project name, version, file name).
const MAX_COMPONENT_LEN: usize = 200;

/// Where the bytes of a version live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ArtifactRef {
    /// File held by the artifact store under the project/platform directory.
    Stored {
        #[serde(rename = "fileName")]
        file_name: String,
    },
    /// External test-distribution URL (iOS / tvOS).
    External { url: String },
}

impl ArtifactRef {
    pub fn stored_file_name(&self) -> Option<&str> {
        match self {
            Self::Stored { file_name } => Some(file_name),
            Self::External { .. } => None,
        }
    }

    pub fn external_url(&self) -> Option<&str> {
        match self {
            Self::External { url } => Some(url),
            Self::Stored { .. } => None,
        }
    }
}

/// A published version of a project on one platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub id: Uuid,
    pub platform: Platform,
    pub version: String,
    pub environment: String,
    pub notes: String,
    pub artifact_ref: Option<ArtifactRef>,
    /// Size of the stored artifact in bytes.
    pub size_bytes: Option<u64>,
    /// Lowercase hex SHA-256 of the stored artifact.
    pub sha256: Option<String>,
    pub uploaded_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub updated_at: Option<OffsetDateTime>,
}

/// Compose the stored file name for an upload: `{version}-{original_name}`.
pub fn compose_file_name(version: &str, original_name: &str) -> String {
    format!("{version}-{original_name}")
}

/// Whether a file name carries one of the accepted artifact extensions.
pub fn has_allowed_extension(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    crate::ALLOWED_EXTENSIONS
        .iter()
        .any(|ext| lower.len() > ext.len() && lower.ends_with(ext))
}

/// Validate a value used as a single path component on durable storage.
///
/// Rejects empty values, `.` and `..`, path separators, control characters
/// and overly long names.
pub fn validate_name_component(kind: &str, value: &str) -> crate::Result<()> {
    if value.trim().is_empty() {
        return Err(crate::Error::InvalidName(format!("{kind} cannot be empty")));
    }
    if value.len() > MAX_COMPONENT_LEN {
        return Err(crate::Error::InvalidName(format!(
            "{kind} exceeds {MAX_COMPONENT_LEN} bytes"
        )));
    }
    if value == "." || value == ".." {
        return Err(crate::Error::InvalidName(format!(
            "{kind} cannot be '{value}'"
        )));
    }
    if let Some(c) = value
        .chars()
        .find(|c| matches!(c, '/' | '\\' | '\0') || c.is_control())
    {
        return Err(crate::Error::InvalidName(format!(
            "{kind} contains forbidden character {c:?}"
        )));
    }
    Ok(())
}
