//! Core domain types and shared logic for the depot distribution service.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Platforms and the URL-vs-file artifact split
//! - Projects, version records and artifact references
//! - Transfer progress events and percent throttling
//! - HTTP byte-range parsing and resolution
//! - Service configuration

pub mod config;
pub mod error;
pub mod hash;
pub mod platform;
pub mod progress;
pub mod project;
pub mod range;
pub mod version;

pub use error::{Error, Result};
pub use hash::{ContentHash, ContentHasher};
pub use platform::Platform;
pub use progress::{ProgressThrottle, TransferProgressEvent};
pub use project::Project;
pub use range::{ByteRange, ResolvedRange};
pub use version::{
    ArtifactRef, VersionRecord, compose_file_name, has_allowed_extension, validate_name_component,
};

/// Maximum size of a single uploaded artifact: 2 GiB.
pub const MAX_ARTIFACT_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Chunk size for streaming copies and reads: 64 KiB.
pub const TRANSFER_CHUNK_SIZE: usize = 64 * 1024;

/// File extensions accepted for stored artifacts (lowercase, with dot).
pub const ALLOWED_EXTENSIONS: &[&str] = &[".ipa", ".apk", ".aab", ".app"];
