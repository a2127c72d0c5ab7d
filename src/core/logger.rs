//! Main logger implementation

use super::{
    config::{Environment, LoggerConfig},
    error::{LoggerError, Result},
    log_context::{keys, ContextProvider, LogContext},
    log_entry::{ErrorInfo, LogEntry},
    log_level::LogLevel,
    metrics::LoggerMetrics,
    transport::Transport,
};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// State shared by a logger and every logger derived from it
struct LoggerCore {
    config: LoggerConfig,
    transports: Vec<Arc<dyn Transport>>,
    context_provider: Option<Arc<dyn ContextProvider>>,
    metrics: LoggerMetrics,
}

/// Structured logger fanning entries out to its transports
///
/// Cloning is cheap. [`Logger::with_context`] derives a logger that shares
/// the transports and configuration but carries its own default context.
#[derive(Clone)]
pub struct Logger {
    core: Arc<LoggerCore>,
    default_context: Arc<LogContext>,
}

/// Everything needed to build one entry
pub(crate) struct EntryParts {
    pub level: LogLevel,
    pub message: String,
    pub context: Option<LogContext>,
    pub error: Option<ErrorInfo>,
    pub duration: Option<f64>,
    pub labels: BTreeMap<String, String>,
}

impl EntryParts {
    pub(crate) fn new(level: LogLevel, message: String) -> Self {
        Self {
            level,
            message,
            context: None,
            error: None,
            duration: None,
            labels: BTreeMap::new(),
        }
    }
}

impl Logger {
    /// Logger with default configuration and no transports
    #[must_use]
    pub fn new() -> Self {
        LoggerBuilder::new().build()
    }

    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use structured_logger::prelude::*;
    ///
    /// let logger = Logger::builder()
    ///     .level(LogLevel::Debug)
    ///     .transport(ConsoleTransport::new())
    ///     .build();
    /// logger.debug("ready");
    /// ```
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.core.config
    }

    pub fn level(&self) -> LogLevel {
        self.core.config.level
    }

    pub fn environment(&self) -> &Environment {
        &self.core.config.environment
    }

    pub fn default_context(&self) -> &LogContext {
        &self.default_context
    }

    /// Names of the registered transports, in fan-out order
    pub fn transport_names(&self) -> Vec<String> {
        self.core
            .transports
            .iter()
            .map(|t| t.name().to_string())
            .collect()
    }

    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.core.config.level
    }

    /// Derive a logger whose default context has `extra` layered on top
    ///
    /// The parent is not modified. Keys in `extra` win on collision.
    #[must_use]
    pub fn with_context(&self, extra: LogContext) -> Logger {
        if extra.is_empty() {
            return self.clone();
        }
        Logger {
            core: Arc::clone(&self.core),
            default_context: Arc::new(self.default_context.merged(&extra)),
        }
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.submit(EntryParts::new(level, message.into()));
    }

    /// Log with structured context fields
    pub fn log_with_context(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        context: LogContext,
    ) {
        let mut parts = EntryParts::new(level, message.into());
        parts.context = Some(context);
        self.submit(parts);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn debug_with_context(&self, message: impl Into<String>, context: LogContext) {
        self.log_with_context(LogLevel::Debug, message, context);
    }

    pub fn info_with_context(&self, message: impl Into<String>, context: LogContext) {
        self.log_with_context(LogLevel::Info, message, context);
    }

    pub fn warn_with_context(&self, message: impl Into<String>, context: LogContext) {
        self.log_with_context(LogLevel::Warn, message, context);
    }

    pub fn error_with_context(&self, message: impl Into<String>, context: LogContext) {
        self.log_with_context(LogLevel::Error, message, context);
    }

    /// Error entry carrying a captured failure and its source chain
    pub fn error_with_error<E>(&self, message: impl Into<String>, context: LogContext, err: &E)
    where
        E: std::error::Error + ?Sized,
    {
        let mut parts = EntryParts::new(LogLevel::Error, message.into());
        parts.context = Some(context);
        parts.error = Some(ErrorInfo::from_error(err));
        self.submit(parts);
    }

    /// Start a monotonic stopwatch
    ///
    /// The returned closure yields the milliseconds elapsed since this call.
    ///
    /// ```
    /// let logger = structured_logger::Logger::new();
    /// let elapsed = logger.start_timer();
    /// assert!(elapsed() >= 0.0);
    /// ```
    pub fn start_timer(&self) -> impl Fn() -> f64 + Send + Sync + 'static {
        let started = Instant::now();
        move || started.elapsed().as_secs_f64() * 1000.0
    }

    /// Run `operation`, logging its outcome with the elapsed time
    ///
    /// On success an info entry `"{label} completed"` is logged; on failure an
    /// error entry `"{label} failed"` with the failure's message. Either way the
    /// operation's own result is returned untouched. Use [`Logger::time_err`]
    /// when the failure is a `std::error::Error` and its cause chain matters.
    pub async fn time<F, T, E>(
        &self,
        label: &str,
        operation: F,
        context: Option<LogContext>,
    ) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        self.time_with(label, operation, context, |err| ErrorInfo::from_display(err))
            .await
    }

    /// Like [`Logger::time`], but captures the failure's source chain and
    /// backtrace the way [`Logger::error_with_error`] does
    pub async fn time_err<F, T, E>(
        &self,
        label: &str,
        operation: F,
        context: Option<LogContext>,
    ) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: std::error::Error,
    {
        self.time_with(label, operation, context, |err| ErrorInfo::from_error(err))
            .await
    }

    async fn time_with<F, T, E>(
        &self,
        label: &str,
        operation: F,
        context: Option<LogContext>,
        capture: impl FnOnce(&E) -> ErrorInfo,
    ) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
    {
        let elapsed = self.start_timer();
        let result = operation.await;
        let duration = elapsed();

        let context = context
            .unwrap_or_default()
            .with_field("operation", label);

        let parts = match &result {
            Ok(_) => {
                let mut parts = EntryParts::new(LogLevel::Info, format!("{} completed", label));
                parts.context = Some(context);
                parts.duration = Some(duration);
                parts
            }
            Err(err) => {
                let mut parts = EntryParts::new(LogLevel::Error, format!("{} failed", label));
                parts.context = Some(context);
                parts.duration = Some(duration);
                parts.error = Some(capture(err));
                parts
            }
        };
        self.submit(parts);

        result
    }

    /// Re-emit an already-built entry (e.g. one relayed from a client)
    ///
    /// Level, message, timestamp and the rest are kept; the logger's default
    /// and ambient context are layered beneath the entry's own context.
    pub fn log_entry(&self, entry: &LogEntry) {
        if !self.is_enabled(entry.level()) {
            self.core.metrics.record_filtered();
            return;
        }

        let mut context = self.base_context();
        context.merge(entry.context());
        self.dispatch(&entry.clone().with_context(context));
    }

    pub(crate) fn submit(&self, parts: EntryParts) {
        if !self.is_enabled(parts.level) {
            self.core.metrics.record_filtered();
            return;
        }

        let entry = self.build_entry(parts);
        self.dispatch(&entry);
    }

    /// Default context with the ambient provider's fields on top
    fn base_context(&self) -> LogContext {
        let mut context = (*self.default_context).clone();
        if let Some(provider) = &self.core.context_provider {
            context.merge(&provider.current_context());
        }
        context
    }

    /// Default context < ambient provider < call-site context
    fn build_entry(&self, parts: EntryParts) -> LogEntry {
        let mut context = self.base_context();
        if let Some(call_context) = &parts.context {
            context.merge(call_context);
        }
        if !context.contains_key(keys::ENVIRONMENT) {
            context.add_field(keys::ENVIRONMENT, self.core.config.environment.as_str());
        }

        let mut entry = LogEntry::new(parts.level, parts.message)
            .with_context(context)
            .with_labels(parts.labels);
        if let Some(error) = parts.error {
            entry = entry.with_error(error);
        }
        if let Some(duration) = parts.duration {
            entry = entry.with_duration(duration);
        }
        entry
    }

    /// Per-transport isolation: an error or a panic in one transport is
    /// reported and counted, and the remaining transports still get the entry.
    fn dispatch(&self, entry: &LogEntry) {
        self.core.metrics.record_logged();

        for (idx, transport) in self.core.transports.iter().enumerate() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                transport.log(entry)
            }));

            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.core.metrics.record_transport_failure();
                    eprintln!(
                        "[LOGGER ERROR] Transport #{} ({}) failed: {}",
                        idx,
                        transport.name(),
                        e
                    );
                }
                Err(panic_info) => {
                    self.core.metrics.record_transport_failure();
                    let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    eprintln!(
                        "[LOGGER CRITICAL] Transport #{} ({}) panicked: {}. \
                         Other transports continue to function.",
                        idx,
                        transport.name(),
                        panic_msg
                    );
                }
            }
        }
    }

    /// Get the logger metrics for detailed observability
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.core.metrics
    }

    /// Run every transport's cleanup in registration order
    ///
    /// Each cleanup is awaited before the next starts; a failing transport
    /// does not keep later ones from cleaning up. The first error is
    /// returned.
    pub async fn cleanup(&self) -> Result<()> {
        let mut first_error: Option<LoggerError> = None;

        for transport in &self.core.transports {
            if let Err(e) = transport.cleanup().await {
                eprintln!(
                    "[LOGGER ERROR] Cleanup of transport '{}' failed: {}",
                    transport.name(),
                    e
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.core.config.level)
            .field("environment", &self.core.config.environment)
            .field("transports", &self.transport_names())
            .field("default_context", &self.default_context)
            .finish()
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use structured_logger::prelude::*;
///
/// let logger = Logger::builder()
///     .level(LogLevel::Debug)
///     .environment(Environment::Production)
///     .default_context(LogContext::new().with_component("billing"))
///     .transport(ConsoleTransport::new())
///     .build();
/// ```
pub struct LoggerBuilder {
    config: LoggerConfig,
    transports: Vec<Arc<dyn Transport>>,
    context_provider: Option<Arc<dyn ContextProvider>>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
            transports: Vec::new(),
            context_provider: None,
        }
    }

    /// Start from a full configuration
    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set minimum log level
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.config.environment = environment;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn default_context(mut self, context: LogContext) -> Self {
        self.config.default_context = context;
        self
    }

    /// Add a transport; transports receive entries in the order added
    #[must_use = "builder methods return a new value"]
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transports.push(Arc::new(transport));
        self
    }

    /// Add a transport that is also referenced elsewhere (e.g. a test probe)
    #[must_use = "builder methods return a new value"]
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Supply ambient context (trace ids, ...) for every entry
    #[must_use = "builder methods return a new value"]
    pub fn context_provider<P: ContextProvider + 'static>(mut self, provider: P) -> Self {
        self.context_provider = Some(Arc::new(provider));
        self
    }

    /// Build the Logger
    pub fn build(self) -> Logger {
        let default_context = Arc::new(self.config.default_context.clone());
        Logger {
            core: Arc::new(LoggerCore {
                config: self.config,
                transports: self.transports,
                context_provider: self.context_provider,
                metrics: LoggerMetrics::new(),
            }),
            default_context,
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
