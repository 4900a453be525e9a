// src/server/context.rs

use crate::config::Config;
use crate::connector::WebSocketConnector;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Holds all the initialized state required to run the server's main loop.
pub struct ServerContext {
    pub config: Config,
    pub listener: TcpListener,
    pub connector: WebSocketConnector<TcpStream>,
    /// Cancelling this token stops the connector and, with it, every connection.
    pub shutdown: CancellationToken,
    pub connection_permits: Arc<Semaphore>,
}
