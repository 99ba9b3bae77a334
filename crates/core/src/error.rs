//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid platform: {0}")]
    InvalidPlatform(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("invalid file type: {0} (allowed: .ipa, .apk, .aab, .app)")]
    InvalidFileType(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
