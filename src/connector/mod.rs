// src/connector/mod.rs

//! The connection registry and event dispatcher.
//!
//! A `Connector` owns the set of live connections. Every connection added to
//! it gets its read loop opened and a dispatch task that decodes inbound frames
//! and routes them to the event handler. `start` drives the periodic eviction
//! sweep and, when its token is cancelled, closes every registered connection.
//!
//! A connection closed by any path stays in the registry until the next sweep,
//! so the registry may be stale by at most one cleanup interval.

mod config;
mod guard;
mod handler;

pub use config::{ConnectorConfig, DEFAULT_CLEAN_INTERVAL};
pub use handler::{ErrorHandler, EventHandler};

use crate::connection::{Connection, SocketConnection, WebSocketTransport};
use crate::core::{ConnectorError, Event, Logger, NopLogger};
use bytes::Bytes;
use guard::StartGuard;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// A connector over WebSocket connections on the stream type `S`.
pub type WebSocketConnector<S> = Connector<SocketConnection<WebSocketTransport<S>>>;

/// Registers connections and dispatches their inbound events.
///
/// Cloning yields another handle to the same registry.
pub struct Connector<C: Connection> {
    inner: Arc<ConnectorInner<C>>,
}

struct ConnectorInner<C: Connection> {
    connections: RwLock<Vec<C>>,
    log: Arc<dyn Logger>,
    event_handler: Arc<dyn EventHandler<C>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    clean_interval: Duration,
    is_started: AtomicBool,
}

impl<C: Connection> Connector<C> {
    /// Creates a connector with the default settings.
    pub fn new(event_handler: impl EventHandler<C> + 'static) -> Self {
        Self::with_configs(event_handler, std::iter::empty())
    }

    /// Creates a connector, applying each config layer in order.
    pub fn with_configs(
        event_handler: impl EventHandler<C> + 'static,
        configs: impl IntoIterator<Item = ConnectorConfig>,
    ) -> Self {
        let mut log: Arc<dyn Logger> = Arc::new(NopLogger);
        let mut error_handler = None;
        let mut clean_interval = DEFAULT_CLEAN_INTERVAL;

        for config in configs {
            if !config.clean_interval.is_zero() {
                clean_interval = config.clean_interval;
            }
            if let Some(logger) = config.logger {
                log = logger;
            }
            if let Some(handler) = config.error_handler {
                error_handler = Some(handler);
            }
        }

        Self {
            inner: Arc::new(ConnectorInner {
                connections: RwLock::new(Vec::new()),
                log,
                event_handler: Arc::new(event_handler),
                error_handler,
                clean_interval,
                is_started: AtomicBool::new(false),
            }),
        }
    }

    /// Runs the sweep loop until `shutdown` is cancelled, then closes every
    /// registered connection and returns `Ok(())`.
    ///
    /// Fails immediately with [`ConnectorError::AlreadyStarted`] while another
    /// run is active.
    pub async fn start(&self, shutdown: CancellationToken) -> Result<(), ConnectorError> {
        let _guard =
            StartGuard::acquire(&self.inner.is_started).ok_or(ConnectorError::AlreadyStarted)?;

        let period = self.inner.clean_interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    self.inner.close_all().await;
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.inner.clean();
                }
            }
        }
    }

    /// Opens `conn`, registers it and spawns its dispatch task.
    ///
    /// Must be called from within a Tokio runtime. Never waits on the connection.
    pub fn add_connection(&self, conn: C) {
        self.inner
            .log
            .debug(format_args!("Added connection {}.", conn.id()));

        conn.open();
        self.inner.connections.write().push(conn.clone());

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.listen(conn).await;
        });
    }

    /// A snapshot of the registry. Later registrations and sweeps are not
    /// reflected in the returned vector.
    pub fn get_connections(&self) -> Vec<C> {
        self.inner.connections.read().clone()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.read().len()
    }

    pub fn clean_interval(&self) -> Duration {
        self.inner.clean_interval
    }

    pub fn is_started(&self) -> bool {
        self.inner
            .is_started
            .load(std::sync::atomic::Ordering::Acquire)
    }
}

impl<C: Connection> Clone for Connector<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connection> ConnectorInner<C> {
    async fn close_all(&self) {
        self.log.debug(format_args!("Closing all connections..."));

        // The registry lock is not held across the closes.
        let connections = self.connections.read().clone();
        futures::future::join_all(connections.iter().map(|conn| conn.close())).await;
    }

    /// Evicts every connection whose `closed` flag is set.
    fn clean(&self) {
        self.log.debug(format_args!("Cleaning closed connections..."));

        let mut connections = self.connections.write();
        let before = connections.len();
        connections.retain(|conn| !conn.closed());
        let evicted = before - connections.len();
        if evicted > 0 {
            self.log.debug(format_args!("Evicted {evicted} closed connections."));
        }
    }

    /// Dispatches messages for one connection until it closes.
    ///
    /// A message already buffered when the close signal fires is still
    /// delivered, so per-connection ordering holds up to the last frame read.
    async fn listen(&self, conn: C) {
        let close_signal = conn.close_signal();
        loop {
            tokio::select! {
                biased;
                message = conn.next_message() => match message {
                    Some(data) => self.on_message(&conn, data).await,
                    None => break,
                },
                _ = close_signal.cancelled() => break,
            }
        }
        self.log.debug(format_args!("Connection {} closed.", conn.id()));
    }

    async fn on_message(&self, conn: &C, data: Bytes) {
        let event = match Event::decode(&data) {
            Ok(event) => event,
            Err(e) => {
                self.log.debug(format_args!("Error on parse raw event: {e}"));
                return;
            }
        };

        if let Err(err) = self
            .event_handler
            .handle(conn, event.event_type, event.data_bytes())
            .await
        {
            match &self.error_handler {
                Some(handler) => handler.handle(err),
                None => self.log.error(format_args!("{err:#}")),
            }
        }
    }
}
