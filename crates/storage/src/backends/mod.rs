//! Storage backend implementations.

pub mod filesystem;

pub use filesystem::FilesystemBackend;
