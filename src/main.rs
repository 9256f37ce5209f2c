//! reboltdb - a RethinkDB-wire-compatible server over an ordered
//! key/value store.

use reboltdb_server::{Config, Server, ServerConfig};
use reboltdb_storage::Storage;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if REBOLTDB_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var("REBOLTDB_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            // If a config file was explicitly specified, fail on error
            if std::env::var("REBOLTDB_CONFIG").is_ok() {
                tracing::error!("Failed to load config: {}", e);
                return Err(e.into());
            }
            // Otherwise fall back to defaults
            tracing::info!("Using default configuration");
            Config::default()
        }
    };

    tracing::info!("Starting reboltdb server");
    tracing::info!("  Bind address: {}", config.network.bind_addr);
    tracing::info!("  Database file: {}", config.storage.path.display());
    tracing::info!(
        "  Authentication: SCRAM-SHA-256 (user {:?})",
        config.auth.username
    );

    // Open the underlying key/value store; held for the process lifetime
    // and closed on exit.
    let storage = match Storage::open(&config.storage.path) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Unable to open underlying database: {}", e);
            return Err(e.into());
        }
    };

    let mut server_config = ServerConfig::new(config.network.bind_addr);
    server_config.handshake_timeout = config.network.handshake_timeout();
    server_config.max_connections = config.network.max_connections;

    let server = Arc::new(Server::new(server_config, &config.auth, storage)?);

    // Spawn shutdown signal handler
    let shutdown_server = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown_server.shutdown();
    });

    // Run server (blocks until shutdown)
    server.run().await?;

    tracing::info!("Server stopped");
    Ok(())
}
