//! Core logger types and traits

pub mod config;
pub mod entry_builder;
pub mod error;
pub mod log_context;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod transport;

pub use config::{parse_size, DeploymentTarget, Environment, LoggerConfig};
pub use entry_builder::EntryBuilder;
pub use error::{LoggerError, Result};
pub use log_context::{keys, ContextProvider, FieldValue, LogContext};
pub use log_entry::{ErrorInfo, LogEntry};
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder};
pub use metrics::{LoggerMetrics, RemoteMetrics};
pub use transport::Transport;
