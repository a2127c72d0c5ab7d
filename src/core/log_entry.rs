//! Log entry structure

use super::log_context::{FieldValue, LogContext};
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A failure captured alongside an error-level entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Type name of the failure
    pub kind: String,
    pub message: String,
    /// Messages of the `source()` chain, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorInfo {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            causes: Vec::new(),
            stack: None,
        }
    }

    /// Capture a `std::error::Error`, walking its source chain
    ///
    /// A backtrace is recorded when the process has backtraces enabled
    /// (`RUST_BACKTRACE` / `RUST_LIB_BACKTRACE`).
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        let backtrace = std::backtrace::Backtrace::capture();
        let stack = match backtrace.status() {
            std::backtrace::BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };

        Self {
            kind: short_type_name(std::any::type_name_of_val(err)),
            message: err.to_string(),
            causes,
            stack,
        }
    }

    /// Capture any displayable failure (e.g. `anyhow::Error`, `String`)
    pub fn from_display<E: fmt::Display + ?Sized>(err: &E) -> Self {
        Self::new(short_type_name(std::any::type_name::<E>()), err.to_string())
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        for cause in &self.causes {
            write!(f, " (caused by: {})", cause)?;
        }
        Ok(())
    }
}

fn short_type_name(full: &str) -> String {
    // "std::io::error::Error" -> "Error", keeping generic args intact
    let base = full.split('<').next().unwrap_or(full);
    let short = base.rsplit("::").next().unwrap_or(base);
    format!("{}{}", short, &full[base.len()..])
}

/// One structured log record
///
/// Entries are immutable: every field is private and only readable through
/// accessors. Builder methods consume the entry before it is handed to any
/// transport; enrichment afterwards goes through [`LogEntry::derive_with_fields`],
/// which returns a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    level: LogLevel,
    message: String,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "LogContext::is_empty")]
    context: LogContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    labels: Option<BTreeMap<String, String>>,
}

impl LogEntry {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// to prevent attackers from injecting fake log entries.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            level,
            message: Self::sanitize_message(&message),
            timestamp: Utc::now(),
            context: LogContext::new(),
            error: None,
            duration: None,
            labels: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: LogContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.error = Some(error);
        self
    }

    /// Elapsed time in milliseconds
    #[must_use]
    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration = Some(duration_ms);
        self
    }

    #[must_use]
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = if labels.is_empty() { None } else { Some(labels) };
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Copy of this entry with extra context fields layered on top
    #[must_use]
    pub fn derive_with_fields(&self, extra: &LogContext) -> LogEntry {
        let mut derived = self.clone();
        derived.context.merge(extra);
        derived
    }

    /// Copy of this entry with a single extra context field
    #[must_use]
    pub fn derive_with_field(&self, key: impl Into<String>, value: impl Into<FieldValue>) -> LogEntry {
        self.derive_with_fields(&LogContext::new().with_field(key, value))
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn context(&self) -> &LogContext {
        &self.context
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.labels.as_ref()
    }

    /// ISO-8601 timestamp with millisecond precision
    pub fn timestamp_iso(&self) -> String {
        self.timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}
