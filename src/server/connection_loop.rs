// src/server/connection_loop.rs

//! Contains the main server loop for accepting connections and handling graceful shutdown.

use super::context::ServerContext;
use crate::connection::{Connection, SocketConnection, WebSocketTransport};
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// The main server loop that accepts connections and handles graceful shutdown.
pub async fn run(ctx: ServerContext) -> Result<()> {
    let mut client_tasks = JoinSet::new();

    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;

    let connector = ctx.connector.clone();
    let shutdown = ctx.shutdown.clone();
    let mut connector_task = tokio::spawn(async move { connector.start(shutdown).await });

    loop {
        tokio::select! {
            biased;

            _ = sigint.recv() => {
                info!("SIGINT received, initiating graceful shutdown.");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, initiating graceful shutdown.");
                break;
            }

            res = &mut connector_task => {
                match res {
                    Ok(Ok(())) => warn!("Connector stopped unexpectedly without an error."),
                    Ok(Err(e)) => error!("CRITICAL: Connector failed: {}. Shutting down.", e),
                    Err(e) => error!("CRITICAL: Connector panicked: {e:?}. Shutting down."),
                }
                return Ok(());
            }

            res = ctx.listener.accept() => {
                let (socket, addr) = match res {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                };

                let Ok(permit) = ctx.connection_permits.clone().try_acquire_owned() else {
                    warn!(
                        "Refusing connection from {}: max_connections ({}) reached.",
                        addr, ctx.config.max_connections
                    );
                    continue;
                };

                info!("Accepted new connection from: {}", addr);
                let connector = ctx.connector.clone();
                client_tasks.spawn(async move {
                    let ws = match tokio_tungstenite::accept_async(socket).await {
                        Ok(ws) => ws,
                        Err(e) => {
                            warn!("WebSocket handshake error for {addr}: {e}");
                            return;
                        }
                    };

                    let metadata = HashMap::from([(
                        "remote_addr".to_string(),
                        Value::from(addr.to_string()),
                    )]);
                    let conn =
                        SocketConnection::new_with_metadata(WebSocketTransport::new(ws), metadata);
                    let close_signal = conn.close_signal();
                    connector.add_connection(conn);

                    // The permit is held until the connection closes.
                    close_signal.cancelled().await;
                    drop(permit);
                });
            }

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A client task panicked: {e:?}");
                }
            }
        }
    }

    info!("Shutting down. Closing all connections.");
    ctx.shutdown.cancel();
    match connector_task.await {
        Ok(Ok(())) => info!("All client connections closed."),
        Ok(Err(e)) => error!("Connector returned an error during shutdown: {}", e),
        Err(e) => error!("Connector task panicked during shutdown: {e:?}"),
    }

    // Tasks still mid-handshake never reached the registry.
    client_tasks.shutdown().await;
    info!("Server shutdown complete.");
    Ok(())
}
