//! Logger composition per deployment target
//!
//! A client logger writes to the console and ships to a collector; a server
//! logger additionally keeps rotating JSON files. Both are the same
//! [`Logger`] type with a different transport list.

use crate::core::{
    ContextProvider, DeploymentTarget, Logger, LoggerBuilder, LoggerConfig, Result, Transport,
};
use crate::transports::{ConsoleTransport, FileTransport, RemoteTransport};
use std::sync::Arc;

/// Transports enabled by `config` that make sense for `target`
///
/// A transport whose options are unusable (bad endpoint, no runtime for the
/// remote worker, unwritable log directory) is skipped with a diagnostic on
/// stderr so the remaining ones still work.
pub fn build_transports(config: &LoggerConfig, target: DeploymentTarget) -> Vec<Arc<dyn Transport>> {
    let mut transports: Vec<Arc<dyn Transport>> = Vec::new();

    if config.enable_console {
        transports.push(Arc::new(ConsoleTransport::from_config(config)));
    }

    if config.enable_file && target == DeploymentTarget::Server {
        push_or_warn(&mut transports, "file", FileTransport::from_config(config));
    }

    if config.enable_remote {
        push_or_warn(&mut transports, "remote", remote_transport(config));
    }

    transports
}

fn remote_transport(config: &LoggerConfig) -> Result<RemoteTransport> {
    config.validate()?;
    RemoteTransport::from_logger_config(config)
}

fn push_or_warn<T: Transport + 'static>(
    transports: &mut Vec<Arc<dyn Transport>>,
    name: &str,
    transport: Result<T>,
) {
    match transport {
        Ok(transport) => transports.push(Arc::new(transport)),
        Err(e) => eprintln!("[LOGGER WARNING] Skipping {} transport: {}", name, e),
    }
}

/// Build a logger for `target` from `config`
///
/// # Example
///
/// ```
/// use structured_logger::{create_logger, DeploymentTarget, Environment, LoggerConfig};
///
/// let logger = create_logger(
///     LoggerConfig::for_environment(Environment::Test),
///     DeploymentTarget::Client,
/// );
/// assert_eq!(logger.transport_names(), vec!["console"]);
/// ```
pub fn create_logger(config: LoggerConfig, target: DeploymentTarget) -> Logger {
    logger_builder(config, target).build()
}

/// Like [`create_logger`] with an ambient context provider (e.g. span lookup)
pub fn create_logger_with_provider<P>(
    config: LoggerConfig,
    target: DeploymentTarget,
    provider: P,
) -> Logger
where
    P: ContextProvider + 'static,
{
    logger_builder(config, target).context_provider(provider).build()
}

fn logger_builder(config: LoggerConfig, target: DeploymentTarget) -> LoggerBuilder {
    let transports = build_transports(&config, target);
    transports
        .into_iter()
        .fold(Logger::builder().config(config), LoggerBuilder::shared_transport)
}
