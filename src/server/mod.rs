// src/server/mod.rs

//! A WebSocket echo server built on the connector.

use crate::config::Config;
use anyhow::Result;

mod connection_loop;
mod context;
mod echo;
mod initialization;

pub use context::ServerContext;
pub use echo::EchoHandler;

/// The main server startup function, orchestrating all setup phases.
pub async fn run(config: Config) -> Result<()> {
    // 1. Bind the listener and build the connector.
    let server_context = initialization::setup(config).await?;

    // 2. Accept connections until a shutdown signal arrives.
    connection_loop::run(server_context).await
}
