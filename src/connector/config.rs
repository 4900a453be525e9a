// src/connector/config.rs

//! Optional settings applied when constructing a `Connector`.

use super::handler::ErrorHandler;
use crate::core::Logger;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The interval between eviction sweeps when none is configured.
pub const DEFAULT_CLEAN_INTERVAL: Duration = Duration::from_secs(60);

/// One layer of connector settings. Several may be applied in order; a field
/// left unset keeps whatever an earlier layer (or the default) provided.
#[derive(Clone, Default)]
pub struct ConnectorConfig {
    pub logger: Option<Arc<dyn Logger>>,
    /// When unset, handler errors are logged at error level.
    pub error_handler: Option<Arc<dyn ErrorHandler>>,
    /// `Duration::ZERO` means "not set".
    pub clean_interval: Duration,
}

impl ConnectorConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    pub fn with_error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn with_clean_interval(mut self, interval: Duration) -> Self {
        self.clean_interval = interval;
        self
    }
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("logger", &self.logger.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .field("clean_interval", &self.clean_interval)
            .finish()
    }
}
