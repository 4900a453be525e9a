// src/core/mod.rs

//! Shared building blocks: the error type, the wire envelope and the logging sink.

pub mod errors;
pub mod event;
pub mod logger;

pub use errors::ConnectorError;
pub use event::Event;
pub use logger::{Logger, NopLogger, TracingLogger};
