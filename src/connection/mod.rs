// src/connection/mod.rs

//! The capability set every registered connection provides, plus the
//! transport-backed implementation used by the connector.

mod metadata;
mod socket;
mod transport;
mod websocket;

pub use metadata::Metadata;
pub use socket::SocketConnection;
pub use transport::Transport;
pub use websocket::WebSocketTransport;

use crate::core::ConnectorError;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One logical duplex message stream between this process and a remote peer.
///
/// Implementations are cheap-to-clone handles; every clone refers to the same
/// underlying stream, so the connector can keep one in its registry while a
/// dispatch task holds another.
#[async_trait]
pub trait Connection: Clone + Send + Sync + 'static {
    /// The process-unique identifier assigned at creation.
    fn id(&self) -> Uuid;

    /// Two connections are equal iff their identifiers match. `None` never is.
    fn equals<O: Connection>(&self, other: Option<&O>) -> bool {
        other.is_some_and(|other| other.id() == self.id())
    }

    /// A point-in-time copy of the metadata map.
    fn metadata(&self) -> HashMap<String, Value>;
    fn with_metadata(&self, key: impl Into<String>, value: Value);
    fn get_metadata(&self, key: &str) -> Option<Value>;
    fn delete_metadata(&self, key: &str);

    /// Fires once, when the connection is closed. Never carries a value.
    fn close_signal(&self) -> CancellationToken;

    /// Waits for the next inbound payload. Returns `None` once the message
    /// channel has been closed and drained.
    async fn next_message(&self) -> Option<Bytes>;

    /// True while the read loop is running.
    fn opened(&self) -> bool;
    /// True once `close` has been called. Never reverts.
    fn closed(&self) -> bool;

    /// Starts the read loop. No-op if already opened or closed.
    fn open(&self);

    /// Closes the transport and both channels. Only the first call has any effect.
    async fn close(&self);

    /// Wraps `data` in an event envelope and writes it to the transport.
    ///
    /// Returns `Ok(())` without writing if the connection is already closed.
    async fn send_event<D>(&self, event_type: i64, data: &D) -> Result<(), ConnectorError>
    where
        D: Serialize + Sync + ?Sized;
}
