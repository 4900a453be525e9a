// src/connector/handler.rs

//! The application-supplied behaviours the connector invokes while dispatching.

use crate::connection::Connection;
use async_trait::async_trait;
use bytes::Bytes;

/// Receives every successfully decoded inbound event.
///
/// `data` is the raw JSON of the envelope's `data` field, left for the
/// handler to interpret. Returning an error never closes the connection.
#[async_trait]
pub trait EventHandler<C: Connection>: Send + Sync {
    async fn handle(&self, conn: &C, event_type: i64, data: Bytes) -> anyhow::Result<()>;
}

/// Receives every error returned by the [`EventHandler`].
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, err: anyhow::Error);
}

impl<F> ErrorHandler for F
where
    F: Fn(anyhow::Error) + Send + Sync,
{
    fn handle(&self, err: anyhow::Error) {
        self(err)
    }
}
