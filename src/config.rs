// src/config.rs

//! Manages configuration of the demo server: loading from TOML and validation.

use crate::connector::ConnectorConfig;
use crate::core::TracingLogger;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::warn;

/// The validated server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Connections beyond this limit are refused right after the TCP accept.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// How often closed connections are evicted from the registry, e.g. `"30s"`.
    #[serde(default = "default_cleanup_interval", with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    7979
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_connections() -> usize {
    10000
}
fn default_cleanup_interval() -> Duration {
    Duration::from_secs(60)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            max_connections: default_max_connections(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid config in '{path}'"))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration to ensure logical consistency.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.max_connections == 0 {
            return Err(anyhow!("max_connections cannot be 0"));
        }
        if self.cleanup_interval.is_zero() {
            return Err(anyhow!("cleanup_interval cannot be 0"));
        }
        if self.cleanup_interval < Duration::from_millis(100) {
            warn!(
                "low cleanup_interval setting: {:?}. Sweeps this frequent contend with new registrations.",
                self.cleanup_interval
            );
        }
        Ok(())
    }

    /// The connector settings derived from this configuration.
    pub fn connector_config(&self) -> ConnectorConfig {
        ConnectorConfig::new()
            .with_logger(TracingLogger)
            .with_clean_interval(self.cleanup_interval)
    }
}
