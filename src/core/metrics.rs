//! Logger and transport metrics for observability
//!
//! Provides counters for monitoring logger health: how many entries were
//! fanned out or filtered, how often a transport failed, and how the remote
//! transport's deliveries are going.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use structured_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_logged();
/// metrics.record_filtered();
///
/// assert_eq!(metrics.total_logged(), 1);
/// assert_eq!(metrics.filtered_count(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Entries that passed the level filter and were fanned out
    total_logged: AtomicU64,

    /// Entries dropped by the level threshold
    filtered_count: AtomicU64,

    /// Individual transport invocations that returned an error or panicked
    transport_failures: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            total_logged: AtomicU64::new(0),
            filtered_count: AtomicU64::new(0),
            transport_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn total_logged(&self) -> u64 {
        self.total_logged.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered_count(&self) -> u64 {
        self.filtered_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn transport_failures(&self) -> u64 {
        self.transport_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_logged(&self) -> u64 {
        self.total_logged.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_transport_failure(&self) -> u64 {
        self.transport_failures.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            total_logged: AtomicU64::new(self.total_logged()),
            filtered_count: AtomicU64::new(self.filtered_count()),
            transport_failures: AtomicU64::new(self.transport_failures()),
        }
    }
}

/// Delivery counters for the remote transport
#[derive(Debug)]
pub struct RemoteMetrics {
    batches_delivered: AtomicU64,
    entries_delivered: AtomicU64,
    failed_attempts: AtomicU64,
    retries_scheduled: AtomicU64,
    entries_to_fallback: AtomicU64,
}

impl RemoteMetrics {
    pub const fn new() -> Self {
        Self {
            batches_delivered: AtomicU64::new(0),
            entries_delivered: AtomicU64::new(0),
            failed_attempts: AtomicU64::new(0),
            retries_scheduled: AtomicU64::new(0),
            entries_to_fallback: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn batches_delivered(&self) -> u64 {
        self.batches_delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn entries_delivered(&self) -> u64 {
        self.entries_delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_attempts(&self) -> u64 {
        self.failed_attempts.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn retries_scheduled(&self) -> u64 {
        self.retries_scheduled.load(Ordering::Relaxed)
    }

    /// Entries abandoned for remote delivery and emitted locally instead
    #[inline]
    pub fn entries_to_fallback(&self) -> u64 {
        self.entries_to_fallback.load(Ordering::Relaxed)
    }

    pub(crate) fn record_delivered(&self, entries: usize) {
        self.batches_delivered.fetch_add(1, Ordering::Relaxed);
        self.entries_delivered
            .fetch_add(entries as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_attempt(&self) {
        self.failed_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry_scheduled(&self) {
        self.retries_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fallback(&self, entries: usize) {
        self.entries_to_fallback
            .fetch_add(entries as u64, Ordering::Relaxed);
    }
}

impl Default for RemoteMetrics {
    fn default() -> Self {
        Self::new()
    }
}
