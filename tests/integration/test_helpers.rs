// tests/integration/test_helpers.rs

//! Test helpers and utilities for integration tests

use async_trait::async_trait;
use bytes::Bytes;
use connector::connection::{Connection, SocketConnection, Transport};
use connector::connector::EventHandler;
use connector::core::{ConnectorError, Logger};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

pub type FakeConnection = SocketConnection<FakeTransport>;

/// Shared state between a `FakeTransport` and the `FakeRemote` that drives it.
#[derive(Default)]
struct FakeState {
    written: Mutex<Vec<String>>,
    close_count: AtomicUsize,
    fail_writes: AtomicBool,
    stall_close: AtomicBool,
}

/// An in-memory transport. Frames are pushed through the paired `FakeRemote`.
pub struct FakeTransport {
    incoming: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<Bytes, ConnectorError>>>,
    state: Arc<FakeState>,
}

/// The test's side of a `FakeTransport`.
#[derive(Clone)]
pub struct FakeRemote {
    tx: mpsc::UnboundedSender<Result<Bytes, ConnectorError>>,
    state: Arc<FakeState>,
}

impl FakeTransport {
    pub fn pair() -> (FakeTransport, FakeRemote) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(FakeState::default());
        (
            FakeTransport {
                incoming: tokio::sync::Mutex::new(rx),
                state: state.clone(),
            },
            FakeRemote { tx, state },
        )
    }
}

impl FakeRemote {
    /// Queues a text frame for the connection to receive.
    pub fn push(&self, frame: &str) {
        let _ = self.tx.send(Ok(Bytes::from(frame.to_string())));
    }

    /// Queues a receive error.
    pub fn fail(&self) {
        let _ = self
            .tx
            .send(Err(ConnectorError::Transport("connection reset".into())));
    }

    pub fn fail_writes(&self) {
        self.state.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Makes every later transport close hang forever.
    pub fn stall_close(&self) {
        self.state.stall_close.store(true, Ordering::SeqCst);
    }

    pub fn written(&self) -> Vec<String> {
        self.state.written.lock().clone()
    }

    pub fn close_count(&self) -> usize {
        self.state.close_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn receive(&self) -> Result<Bytes, ConnectorError> {
        self.incoming
            .lock()
            .await
            .recv()
            .await
            .unwrap_or(Err(ConnectorError::ConnectionClosed))
    }

    async fn write_json<V>(&self, value: &V) -> Result<(), ConnectorError>
    where
        V: Serialize + Sync + ?Sized,
    {
        if self.state.fail_writes.load(Ordering::SeqCst) {
            return Err(ConnectorError::Transport("broken pipe".into()));
        }
        let json = serde_json::to_string(value)?;
        self.state.written.lock().push(json);
        Ok(())
    }

    async fn close(&self) -> Result<(), ConnectorError> {
        self.state.close_count.fetch_add(1, Ordering::SeqCst);
        if self.state.stall_close.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

/// Creates a connection over a fresh fake transport.
pub fn fake_connection() -> (FakeConnection, FakeRemote) {
    let (transport, remote) = FakeTransport::pair();
    (SocketConnection::new(transport), remote)
}

/// An event handler that records every `(type, data)` pair it sees, and can be
/// told to fail on a given event type.
#[derive(Clone, Default)]
pub struct RecordingHandler {
    pub events: Arc<Mutex<Vec<(i64, String)>>>,
    pub fail_on: Option<i64>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn failing_on(event_type: i64) -> Self {
        Self {
            fail_on: Some(event_type),
            ..Default::default()
        }
    }

    pub fn recorded(&self) -> Vec<(i64, String)> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl<C: Connection> EventHandler<C> for RecordingHandler {
    async fn handle(&self, _conn: &C, event_type: i64, data: Bytes) -> anyhow::Result<()> {
        self.events
            .lock()
            .push((event_type, String::from_utf8_lossy(&data).into_owned()));
        if self.fail_on == Some(event_type) {
            anyhow::bail!("handler rejected event {event_type}");
        }
        Ok(())
    }
}

/// A logger that keeps every line it is given.
#[derive(Clone, Default)]
pub struct RecordingLogger {
    pub debug_lines: Arc<Mutex<Vec<String>>>,
    pub error_lines: Arc<Mutex<Vec<String>>>,
}

impl Logger for RecordingLogger {
    fn debug(&self, args: fmt::Arguments<'_>) {
        self.debug_lines.lock().push(args.to_string());
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        self.error_lines.lock().push(args.to_string());
    }
}

/// Polls `condition` every few milliseconds until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
