//! Target platforms for distributed builds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A distribution platform.
///
/// iOS and tvOS builds are distributed through an external test-distribution
/// URL; every other platform ships an installable file stored by the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Tvos,
    Androidtv,
    Huawei,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Ios,
        Platform::Android,
        Platform::Tvos,
        Platform::Androidtv,
        Platform::Huawei,
    ];

    /// Wire and storage-directory name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Tvos => "tvos",
            Self::Androidtv => "androidtv",
            Self::Huawei => "huawei",
        }
    }

    /// Whether versions for this platform are an external URL rather than a file.
    pub fn is_url_backed(&self) -> bool {
        matches!(self, Self::Ios | Self::Tvos)
    }

    /// Parse a platform name, ignoring ASCII case and surrounding whitespace.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| crate::Error::InvalidPlatform(s.to_string()))
    }
}

impl FromStr for Platform {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Platform::parse("Android").unwrap(), Platform::Android);
        assert_eq!(Platform::parse(" TVOS ").unwrap(), Platform::Tvos);
        assert_eq!(Platform::parse("androidtv").unwrap(), Platform::Androidtv);
        assert!(Platform::parse("windows").is_err());
        assert!(Platform::parse("").is_err());
    }

    #[test]
    fn url_backed_platforms() {
        let url_backed: Vec<_> = Platform::ALL
            .into_iter()
            .filter(Platform::is_url_backed)
            .collect();
        assert_eq!(url_backed, vec![Platform::Ios, Platform::Tvos]);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Platform::Huawei).unwrap();
        assert_eq!(json, "\"huawei\"");
        let parsed: Platform = serde_json::from_str("\"androidtv\"").unwrap();
        assert_eq!(parsed, Platform::Androidtv);
    }
}
