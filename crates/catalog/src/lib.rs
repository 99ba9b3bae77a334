//! Project and version catalog for depot.
//!
//! The transfer pipelines only need a narrow view of the catalog: look up a
//! project or version, check for an existing (platform, version) pair, and
//! append a finished record. The HTTP surface adds project bookkeeping on top.

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{CatalogError, CatalogResult};
pub use repos::{ProjectRepo, VersionRepo};
pub use store::{Catalog, SqliteCatalog};

use depot_core::config::CatalogConfig;
use std::sync::Arc;

/// Create a catalog from configuration.
pub async fn from_config(config: &CatalogConfig) -> CatalogResult<Arc<dyn Catalog>> {
    match config {
        CatalogConfig::Sqlite { path } => {
            if path.as_os_str().is_empty() {
                return Err(CatalogError::Config(
                    "sqlite catalog requires a non-empty path".to_string(),
                ));
            }
            let catalog = SqliteCatalog::new(path).await?;
            Ok(Arc::new(catalog) as Arc<dyn Catalog>)
        }
    }
}
