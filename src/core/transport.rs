//! Transport trait for log output destinations

use super::{error::Result, log_entry::LogEntry};
use async_trait::async_trait;

/// A sink that consumes log entries
///
/// `log` is called synchronously by the [`Logger`](super::Logger) for every
/// entry that passes the level filter; it must return promptly. Transports
/// that buffer (like the remote transport) do their slow work elsewhere and
/// drain it in `cleanup`.
///
/// # Example
///
/// ```
/// use structured_logger::core::{LogEntry, Result, Transport};
/// use parking_lot::Mutex;
///
/// struct MemoryTransport(Mutex<Vec<String>>);
///
/// impl Transport for MemoryTransport {
///     fn log(&self, entry: &LogEntry) -> Result<()> {
///         self.0.lock().push(entry.message().to_string());
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "memory"
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Accept one entry
    fn log(&self, entry: &LogEntry) -> Result<()>;

    /// Release resources and drain anything still buffered
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }

    /// Get the transport name
    fn name(&self) -> &str;
}
