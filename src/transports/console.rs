//! Console transport implementation

use crate::core::{LogEntry, LogLevel, LoggerConfig, Result, Transport};
use colored::Colorize;
use parking_lot::Mutex;
use std::io::Write;

/// Writes entries to stdout/stderr, either as JSON lines or human-readable
///
/// Error entries go to stderr, everything else to stdout. Tests and embedders
/// can redirect all output to a single writer with [`ConsoleTransport::with_writer`].
pub struct ConsoleTransport {
    colorize: bool,
    timestamp: bool,
    structured: bool,
    writer: Option<Mutex<Box<dyn Write + Send>>>,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        Self {
            colorize: true,
            timestamp: true,
            structured: false,
            writer: None,
        }
    }

    /// Console transport honoring `colorize`, `timestamp` and `structured`
    pub fn from_config(config: &LoggerConfig) -> Self {
        Self {
            colorize: config.colorize,
            timestamp: config.timestamp,
            structured: config.structured,
            writer: None,
        }
    }

    #[must_use]
    pub fn with_colors(mut self, colorize: bool) -> Self {
        self.colorize = colorize;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Emit one JSON object per line instead of the human format
    ///
    /// # Example
    ///
    /// ```
    /// use structured_logger::transports::ConsoleTransport;
    ///
    /// let transport = ConsoleTransport::new().structured(true);
    /// ```
    #[must_use]
    pub fn structured(mut self, structured: bool) -> Self {
        self.structured = structured;
        self
    }

    /// Send every line to `writer` instead of stdout/stderr
    #[must_use]
    pub fn with_writer<W: Write + Send + 'static>(mut self, writer: W) -> Self {
        self.writer = Some(Mutex::new(Box::new(writer)));
        self
    }

    /// Render an entry the way this transport would print it
    pub fn format(&self, entry: &LogEntry) -> Result<String> {
        if self.structured {
            return Ok(serde_json::to_string(entry)?);
        }
        Ok(self.format_human(entry))
    }

    fn format_human(&self, entry: &LogEntry) -> String {
        let level = entry.level();
        let level_str = if self.colorize {
            level.to_str().color(level.color_code()).to_string()
        } else {
            level.to_str().to_string()
        };

        let mut line = String::new();
        if self.timestamp {
            line.push_str(&format!("[{}] ", entry.timestamp_iso()));
        }
        line.push_str(&format!("[{}] {}", level_str, entry.message()));

        if !entry.context().is_empty() {
            line.push(' ');
            line.push_str(&entry.context().to_json_value().to_string());
        }
        if let Some(duration) = entry.duration() {
            line.push_str(&format!(" ({:.2}ms)", duration));
        }
        if let Some(error) = entry.error() {
            line.push_str(&format!(" error={}", error.message));
        }

        line
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ConsoleTransport {
    fn log(&self, entry: &LogEntry) -> Result<()> {
        let output = self.format(entry)?;

        if let Some(writer) = &self.writer {
            let mut writer = writer.lock();
            writeln!(writer, "{}", output)?;
            return Ok(());
        }

        match entry.level() {
            LogLevel::Error => eprintln!("{}", output),
            _ => println!("{}", output),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
