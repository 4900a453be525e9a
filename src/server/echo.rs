// src/server/echo.rs

//! The event handler used by the demo server.

use crate::connection::Connection;
use crate::connector::EventHandler;
use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::value::RawValue;
use tracing::debug;

/// Sends every event straight back to the connection it came from, with the
/// same type and data.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoHandler;

#[async_trait]
impl<C: Connection> EventHandler<C> for EchoHandler {
    async fn handle(&self, conn: &C, event_type: i64, data: Bytes) -> anyhow::Result<()> {
        debug!(
            "Echoing event {} ({} bytes) to connection {}",
            event_type,
            data.len(),
            conn.id()
        );

        // Empty only when the event carried no `data` field.
        let raw: Box<RawValue> = if data.is_empty() {
            RawValue::from_string("null".to_string())?
        } else {
            serde_json::from_slice(&data).context("event data is not valid JSON")?
        };

        conn.send_event(event_type, &raw)
            .await
            .with_context(|| format!("failed to echo event {event_type} to {}", conn.id()))
    }
}
