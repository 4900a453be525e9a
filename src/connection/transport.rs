// src/connection/transport.rs

//! The boundary to the raw, already-established duplex stream.

use crate::core::ConnectorError;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

/// A byte-oriented duplex stream with blocking receive and structured writes.
///
/// `receive` and `write_json`/`close` may run concurrently from different
/// tasks; implementations must not let a pending receive block a write or a
/// close. `receive` must be cancel-safe.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Waits for the next payload. Any error ends the connection's read loop.
    async fn receive(&self) -> Result<Bytes, ConnectorError>;

    /// Serializes `value` as JSON and writes it as a single frame.
    async fn write_json<V>(&self, value: &V) -> Result<(), ConnectorError>
    where
        V: Serialize + Sync + ?Sized;

    async fn close(&self) -> Result<(), ConnectorError>;
}
