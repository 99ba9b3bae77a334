//! Repository traits for catalog operations.

pub mod projects;
pub mod versions;

pub use projects::ProjectRepo;
pub use versions::VersionRepo;
