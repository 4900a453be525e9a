// src/connection/websocket.rs

//! A [`Transport`] over an established `tokio-tungstenite` WebSocket stream.

use super::transport::Transport;
use crate::core::ConnectorError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, MutexGuard};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How long `close` waits for the close frame to flush before dropping the socket.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Wraps a WebSocket stream, split into independently locked halves so that a
/// pending receive never holds up a send or a close.
///
/// Both halves are taken and dropped on `close`, which shuts the socket down
/// even when the peer has stopped reading.
pub struct WebSocketTransport<S> {
    sink: Mutex<Option<SplitSink<WebSocketStream<S>, Message>>>,
    stream: Mutex<Option<SplitStream<WebSocketStream<S>>>>,
    /// Cancelled on `close`; aborts any receive or write still in flight.
    closing: CancellationToken,
}

impl<S> WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(ws: WebSocketStream<S>) -> Self {
        let (sink, stream) = ws.split();
        Self {
            sink: Mutex::new(Some(sink)),
            stream: Mutex::new(Some(stream)),
            closing: CancellationToken::new(),
        }
    }

    /// Locks `half` unless the transport starts closing first.
    async fn lock_open<'a, H>(
        &self,
        half: &'a Mutex<Option<H>>,
    ) -> Result<MutexGuard<'a, Option<H>>, ConnectorError> {
        tokio::select! {
            biased;
            _ = self.closing.cancelled() => Err(ConnectorError::ConnectionClosed),
            guard = half.lock() => Ok(guard),
        }
    }
}

#[async_trait]
impl<S> Transport for WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn receive(&self) -> Result<Bytes, ConnectorError> {
        let mut guard = self.lock_open(&self.stream).await?;
        let stream = guard.as_mut().ok_or(ConnectorError::ConnectionClosed)?;
        loop {
            let message = tokio::select! {
                biased;
                _ = self.closing.cancelled() => return Err(ConnectorError::ConnectionClosed),
                message = stream.next() => message,
            };
            match message.ok_or(ConnectorError::ConnectionClosed)?? {
                Message::Text(text) => {
                    return Ok(Bytes::copy_from_slice(text.as_str().as_bytes()));
                }
                Message::Binary(data) => return Ok(data),
                Message::Close(_) => return Err(ConnectorError::ConnectionClosed),
                // Control frames are answered by tungstenite itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    async fn write_json<V>(&self, value: &V) -> Result<(), ConnectorError>
    where
        V: Serialize + Sync + ?Sized,
    {
        let text = serde_json::to_string(value)?;
        let mut guard = self.lock_open(&self.sink).await?;
        let sink = guard.as_mut().ok_or(ConnectorError::ConnectionClosed)?;
        tokio::select! {
            biased;
            _ = self.closing.cancelled() => Err(ConnectorError::ConnectionClosed),
            sent = sink.send(Message::text(text)) => Ok(sent?),
        }
    }

    async fn close(&self) -> Result<(), ConnectorError> {
        // Writers and readers release their locks once this fires.
        self.closing.cancel();

        // Both halves are owned by this future, so a timeout drops the socket.
        let handshake = async {
            let sink = self.sink.lock().await.take();
            let _stream = self.stream.lock().await.take();
            match sink {
                Some(mut sink) => sink.close().await.map_err(ConnectorError::from),
                None => Err(ConnectorError::ConnectionClosed),
            }
        };

        match tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, handshake).await {
            Ok(result) => result,
            Err(_) => {
                debug!("WebSocket close handshake timed out, dropping the socket.");
                Ok(())
            }
        }
    }
}
