// src/connection/socket.rs

//! Defines `SocketConnection`, which drives a single [`Transport`] through its
//! whole lifecycle: read loop, message channel, close signal and outbound sends.

use super::metadata::Metadata;
use super::transport::Transport;
use super::Connection;
use crate::core::{ConnectorError, Event};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// The capacity of the inbound message channel. A single slot keeps the read
/// loop at most one frame ahead of the dispatcher.
const MESSAGE_CHANNEL_CAPACITY: usize = 1;

/// A connection backed by a raw transport.
///
/// Cloning yields another handle to the same connection.
pub struct SocketConnection<T: Transport> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    id: Uuid,
    transport: T,
    metadata: Metadata,
    /// Taken on close so the message channel ends once the read loop exits.
    message_tx: parking_lot::Mutex<Option<mpsc::Sender<Bytes>>>,
    message_rx: tokio::sync::Mutex<mpsc::Receiver<Bytes>>,
    close_signal: CancellationToken,
    opened: AtomicBool,
    closed: AtomicBool,
}

impl<T: Transport> SocketConnection<T> {
    /// Takes ownership of `transport` and assigns a fresh identifier.
    pub fn new(transport: T) -> Self {
        Self::new_with_metadata(transport, HashMap::new())
    }

    /// Like [`SocketConnection::new`], seeding the metadata store.
    pub fn new_with_metadata(transport: T, metadata: HashMap<String, Value>) -> Self {
        let (message_tx, message_rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                transport,
                metadata: Metadata::from_map(metadata),
                message_tx: parking_lot::Mutex::new(Some(message_tx)),
                message_rx: tokio::sync::Mutex::new(message_rx),
                close_signal: CancellationToken::new(),
                opened: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Receives frames until the transport fails or the connection is closed.
    async fn read_loop(&self, message_tx: mpsc::Sender<Bytes>) {
        let close_signal = self.inner.close_signal.clone();
        loop {
            let payload = tokio::select! {
                biased;
                _ = close_signal.cancelled() => return,
                result = self.inner.transport.receive() => match result {
                    Ok(payload) => payload,
                    Err(e) => {
                        if is_normal_disconnect(&e) {
                            debug!("Connection {} closed by peer: {}", self.inner.id, e);
                        } else {
                            warn!("Receive error on connection {}: {}", self.inner.id, e);
                        }
                        self.close().await;
                        return;
                    }
                },
            };

            // Blocks until the dispatcher has room, which stalls further reads
            // from this transport under a slow consumer.
            tokio::select! {
                biased;
                _ = close_signal.cancelled() => return,
                sent = message_tx.send(payload) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl<T: Transport> Connection for SocketConnection<T> {
    fn id(&self) -> Uuid {
        self.inner.id
    }

    fn metadata(&self) -> HashMap<String, Value> {
        self.inner.metadata.snapshot()
    }

    fn with_metadata(&self, key: impl Into<String>, value: Value) {
        self.inner.metadata.insert(key.into(), value);
    }

    fn get_metadata(&self, key: &str) -> Option<Value> {
        self.inner.metadata.get(key)
    }

    fn delete_metadata(&self, key: &str) {
        self.inner.metadata.remove(key);
    }

    fn close_signal(&self) -> CancellationToken {
        self.inner.close_signal.clone()
    }

    async fn next_message(&self) -> Option<Bytes> {
        self.inner.message_rx.lock().await.recv().await
    }

    fn opened(&self) -> bool {
        self.inner.opened.load(Ordering::Acquire)
    }

    fn closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn open(&self) {
        if self.closed() {
            return;
        }
        if self
            .inner
            .opened
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        // A concurrent close may already have taken the sender.
        let Some(message_tx) = self.inner.message_tx.lock().clone() else {
            self.inner.opened.store(false, Ordering::Release);
            return;
        };

        let conn = self.clone();
        tokio::spawn(async move {
            conn.read_loop(message_tx).await;
            conn.inner.opened.store(false, Ordering::Release);
        });
    }

    async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        // Fired before the transport close, which may stall on a slow peer.
        self.inner.close_signal.cancel();
        drop(self.inner.message_tx.lock().take());

        if let Err(e) = self.inner.transport.close().await {
            debug!("Error closing transport for connection {}: {}", self.inner.id, e);
        }
    }

    async fn send_event<D>(&self, event_type: i64, data: &D) -> Result<(), ConnectorError>
    where
        D: Serialize + Sync + ?Sized,
    {
        if self.closed() {
            return Ok(());
        }

        let event = Event::encode(event_type, data)?;
        self.inner.transport.write_json(&event).await
    }
}

impl<T: Transport> Clone for SocketConnection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> PartialEq for SocketConnection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<T: Transport> Eq for SocketConnection<T> {}

impl<T: Transport> fmt::Debug for SocketConnection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketConnection")
            .field("id", &self.inner.id)
            .field("opened", &self.opened())
            .field("closed", &self.closed())
            .finish_non_exhaustive()
    }
}

/// Checks whether an error is a normal peer disconnect rather than a fault.
fn is_normal_disconnect(e: &ConnectorError) -> bool {
    match e {
        ConnectorError::ConnectionClosed => true,
        ConnectorError::Io(arc_err) => matches!(
            arc_err.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof
                | std::io::ErrorKind::ConnectionAborted
        ),
        _ => false,
    }
}
