//! Depot server binary.

use anyhow::{Context, Result};
use clap::Parser;
use depot_core::config::AppConfig;
use depot_server::{AppState, create_router};
use depot_storage::StagingArea;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Depot - app build distribution server
#[derive(Parser, Debug)]
#[command(name = "depotd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "DEPOT_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Depot v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid configuration")?;

    depot_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let storage = depot_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    storage
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!(backend = storage.backend_name(), "Storage backend initialized");

    let catalog = depot_catalog::from_config(&config.catalog)
        .await
        .context("failed to initialize catalog")?;
    tracing::info!("Catalog initialized");

    let staging = StagingArea::new(&config.upload.staging_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create staging directory {}",
                config.upload.staging_dir.display()
            )
        })?;
    let purged = staging
        .purge()
        .await
        .context("failed to clear staging directory")?;
    if purged > 0 {
        tracing::warn!(count = purged, "Removed staged uploads left by a previous run");
    }

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;

    let state = AppState::new(config, storage, catalog, staging);
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Load configuration from an optional TOML file, then `DEPOT_` environment
/// variables (nested keys separated by `__`).
fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if std::path::Path::new(path).exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::info!(config_path = %path, "No config file found, using defaults and environment");
    }

    figment
        .merge(Env::prefixed("DEPOT_").split("__"))
        .extract()
        .context("failed to load configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::config::StorageConfig;

    #[test]
    fn load_config_reads_toml_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("server.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "0.0.0.0:9000"

[storage]
type = "filesystem"
path = "/srv/depot/projects"
"#,
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        match config.storage {
            StorageConfig::Filesystem { path } => {
                assert_eq!(path, std::path::PathBuf::from("/srv/depot/projects"))
            }
        }
    }

    #[test]
    fn load_config_without_file_uses_defaults() {
        let config = load_config("/nonexistent/depot.toml").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.upload.size_limit(), depot_core::MAX_ARTIFACT_SIZE);
    }
}
