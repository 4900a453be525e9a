// src/server/initialization.rs

//! Handles server initialization: binding the listener and building the connector.

use super::context::ServerContext;
use super::echo::EchoHandler;
use crate::config::Config;
use crate::connector::{Connector, ConnectorConfig};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Initializes all server components before starting the main loop.
pub async fn setup(config: Config) -> Result<ServerContext> {
    log_startup_info(&config);

    let connector = Connector::with_configs(
        EchoHandler,
        [
            config.connector_config(),
            ConnectorConfig::new().with_error_handler(|err: anyhow::Error| {
                warn!("Event handler failed: {err:#}");
            }),
        ],
    );
    info!(
        "Connector initialized (cleanup interval {:?}).",
        connector.clean_interval()
    );

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    info!("Connector server listening on {}:{}", config.host, config.port);

    let connection_permits = Arc::new(Semaphore::new(config.max_connections));

    Ok(ServerContext {
        config,
        listener,
        connector,
        shutdown: CancellationToken::new(),
        connection_permits,
    })
}

fn log_startup_info(config: &Config) {
    info!("Starting connector server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Max connections: {}, log level: {}",
        config.max_connections, config.log_level
    );
}
