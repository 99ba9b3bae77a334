//! Projects: the top-level grouping of versions.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A distributable application.
///
/// `name` doubles as the project's directory in the artifact store, so it
/// must pass [`crate::validate_name_component`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub owner: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Project {
    /// Create a new project owned by `owner`, validating the name.
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> crate::Result<Self> {
        let name = name.into().trim().to_string();
        crate::validate_name_component("project name", &name)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            owner: owner.into(),
            created_at: OffsetDateTime::now_utc(),
        })
    }
}
