// src/core/errors.rs

//! Defines the primary error type returned by connections and the connector.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing every failure that is surfaced to a caller.
///
/// Failures inside the read and dispatch loops are never returned; they are
/// logged or forwarded to the configured error handler instead.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// `Connector::start` was called while a previous run is still active.
    #[error("connector already started")]
    AlreadyStarted,

    #[error("Serialization error: {0}")]
    Serialization(Arc<serde_json::Error>),

    #[error("Transport error: {0}")]
    Transport(String),

    /// The peer closed the stream, or the transport has already been closed.
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),
}

// Manual implementation of Clone because neither `std::io::Error` nor
// `serde_json::Error` is cloneable.
impl Clone for ConnectorError {
    fn clone(&self) -> Self {
        match self {
            ConnectorError::AlreadyStarted => ConnectorError::AlreadyStarted,
            ConnectorError::Serialization(e) => ConnectorError::Serialization(Arc::clone(e)),
            ConnectorError::Transport(s) => ConnectorError::Transport(s.clone()),
            ConnectorError::ConnectionClosed => ConnectorError::ConnectionClosed,
            ConnectorError::Io(e) => ConnectorError::Io(Arc::clone(e)),
        }
    }
}

impl PartialEq for ConnectorError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConnectorError::Serialization(e1), ConnectorError::Serialization(e2)) => {
                e1.to_string() == e2.to_string()
            }
            (ConnectorError::Transport(s1), ConnectorError::Transport(s2)) => s1 == s2,
            (ConnectorError::Io(e1), ConnectorError::Io(e2)) => e1.to_string() == e2.to_string(),
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for ConnectorError {
    fn from(e: std::io::Error) -> Self {
        ConnectorError::Io(Arc::new(e))
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(e: serde_json::Error) -> Self {
        ConnectorError::Serialization(Arc::new(e))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ConnectorError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match e {
            WsError::ConnectionClosed | WsError::AlreadyClosed => ConnectorError::ConnectionClosed,
            WsError::Io(io) => ConnectorError::Io(Arc::new(io)),
            other => ConnectorError::Transport(other.to_string()),
        }
    }
}
