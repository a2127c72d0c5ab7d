//! # Structured Logger
//!
//! A structured logging facade: one [`Logger`] type fanning entries out to
//! pluggable transports.
//!
//! ## Features
//!
//! - **Transports**: console (human or JSON), rotating JSON-lines files and
//!   batched HTTP delivery with retry, backoff and local fallback
//! - **Context propagation**: default, ambient and per-call context merged
//!   into every entry; `with_context` derives scoped loggers
//! - **Deployment targets**: client and server transport sets from one config
//! - **Request logging**: axum and actix-web middleware with redaction and
//!   W3C trace context
//!
//! ```
//! use structured_logger::prelude::*;
//!
//! let logger = Logger::builder()
//!     .level(LogLevel::Debug)
//!     .environment(Environment::Development)
//!     .transport(ConsoleTransport::new().with_colors(false))
//!     .build();
//!
//! let request_log = logger.with_context(LogContext::new().with_request_id("r-1"));
//! request_log.info("handling request");
//! ```

pub mod adapters;
pub mod core;
pub mod factory;
pub mod macros;
pub mod transports;

pub mod prelude {
    pub use crate::core::{
        ContextProvider, DeploymentTarget, EntryBuilder, Environment, ErrorInfo, FieldValue,
        LogContext, LogEntry, LogLevel, Logger, LoggerBuilder, LoggerConfig, LoggerError,
        LoggerMetrics, Result, Transport,
    };
    pub use crate::factory::create_logger;
    pub use crate::transports::{ConsoleTransport, FileTransport, RemoteConfig, RemoteTransport};
}

pub use crate::core::{
    keys, ContextProvider, DeploymentTarget, EntryBuilder, Environment, ErrorInfo, FieldValue,
    LogContext, LogEntry, LogLevel, Logger, LoggerBuilder, LoggerConfig, LoggerError,
    LoggerMetrics, RemoteMetrics, Result, Transport,
};
pub use factory::{create_logger, create_logger_with_provider};
pub use transports::{ConsoleTransport, FileTransport, RemoteConfig, RemoteTransport};
