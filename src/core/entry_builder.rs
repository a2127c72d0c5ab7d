//! Fluent construction of a single log entry
//!
//! Useful when an entry needs more than a message and a context: a captured
//! error, an explicit duration, or per-entry labels for the remote backend.

use super::log_context::{FieldValue, LogContext};
use super::log_entry::ErrorInfo;
use super::log_level::LogLevel;
use super::logger::{EntryParts, Logger};

/// Builder for one structured log entry
///
/// Nothing is emitted until [`EntryBuilder::log`] is called. The logger's
/// level filter, default context and ambient provider still apply.
///
/// # Example
///
/// ```
/// use structured_logger::prelude::*;
///
/// let logger = Logger::new();
///
/// logger.info_builder()
///     .message("Request processed")
///     .field("userId", "u-12345")
///     .field("status", 200)
///     .duration_ms(42.5)
///     .label("team", "payments")
///     .log();
/// ```
pub struct EntryBuilder<'a> {
    logger: &'a Logger,
    parts: EntryParts,
    context: LogContext,
}

impl<'a> EntryBuilder<'a> {
    pub fn new(logger: &'a Logger, level: LogLevel) -> Self {
        Self {
            logger,
            parts: EntryParts::new(level, String::new()),
            context: LogContext::new(),
        }
    }

    #[must_use]
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.parts.message = msg.into();
        self
    }

    /// Add a structured field to the log entry
    #[must_use]
    pub fn field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.context.add_field(key, value);
        self
    }

    /// Add multiple fields from a LogContext
    #[must_use]
    pub fn fields(mut self, context: LogContext) -> Self {
        self.context.merge(&context);
        self
    }

    /// Attach a failure and its source chain
    #[must_use]
    pub fn error<E>(mut self, err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        self.parts.error = Some(ErrorInfo::from_error(err));
        self
    }

    #[must_use]
    pub fn error_info(mut self, info: ErrorInfo) -> Self {
        self.parts.error = Some(info);
        self
    }

    #[must_use]
    pub fn duration_ms(mut self, duration: f64) -> Self {
        self.parts.duration = Some(duration);
        self
    }

    /// Per-entry label, forwarded to the remote backend
    #[must_use]
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.labels.insert(key.into(), value.into());
        self
    }

    /// Build and send the log entry
    pub fn log(mut self) {
        if !self.context.is_empty() {
            self.parts.context = Some(self.context);
        }
        self.logger.submit(self.parts);
    }
}

impl Logger {
    pub fn entry(&self, level: LogLevel) -> EntryBuilder<'_> {
        EntryBuilder::new(self, level)
    }

    pub fn debug_builder(&self) -> EntryBuilder<'_> {
        EntryBuilder::new(self, LogLevel::Debug)
    }

    /// Create an info-level entry builder
    ///
    /// ```
    /// use structured_logger::Logger;
    ///
    /// let logger = Logger::new();
    /// logger.info_builder()
    ///     .message("Cache warmed")
    ///     .field("entries", 1024)
    ///     .log();
    /// ```
    pub fn info_builder(&self) -> EntryBuilder<'_> {
        EntryBuilder::new(self, LogLevel::Info)
    }

    pub fn warn_builder(&self) -> EntryBuilder<'_> {
        EntryBuilder::new(self, LogLevel::Warn)
    }

    /// Create an error-level entry builder
    ///
    /// ```
    /// use structured_logger::Logger;
    ///
    /// let logger = Logger::new();
    /// let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "db timeout");
    /// logger.error_builder()
    ///     .message("Database connection failed")
    ///     .field("retryCount", 3)
    ///     .error(&err)
    ///     .log();
    /// ```
    pub fn error_builder(&self) -> EntryBuilder<'_> {
        EntryBuilder::new(self, LogLevel::Error)
    }
}
