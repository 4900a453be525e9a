// src/lib.rs

pub mod config;
pub mod connection;
pub mod connector;
pub mod core;
pub mod server;

// Re-export
pub use crate::connection::{Connection, SocketConnection, Transport, WebSocketTransport};
pub use crate::connector::{
    Connector, ConnectorConfig, ErrorHandler, EventHandler, WebSocketConnector,
};
pub use crate::core::{ConnectorError, Event, Logger, NopLogger, TracingLogger};
