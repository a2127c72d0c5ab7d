//! Batched HTTP delivery with retry, exponential backoff and local fallback
//!
//! Entries are queued in log order and sent as `{logs, timestamp, labels}`
//! JSON batches when either the flush interval elapses or `batch_size`
//! entries are waiting. A batch stays at the head of the queue until the
//! endpoint acknowledges it with a 2xx, so a failed attempt never loses or
//! reorders entries. After `max_retries` failed retries (spaced 2s, 4s,
//! 8s, ...) the batch is handed to the fallback transport instead.

use super::console::ConsoleTransport;
use super::scheduler::{Cancellation, Scheduler};
use crate::core::{
    LogEntry, LoggerConfig, LoggerError, RemoteMetrics, Result, Transport,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;

/// Context key set on entries that were emitted locally instead of remotely
pub const DELIVERY_FAILED_KEY: &str = "remoteDeliveryFailed";

/// Wire payload of one remote POST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteBatch {
    pub logs: Vec<LogEntry>,
    /// When the batch was sent
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl RemoteBatch {
    pub fn new(logs: Vec<LogEntry>, labels: BTreeMap<String, String>) -> Self {
        Self {
            logs,
            timestamp: Utc::now(),
            labels,
        }
    }
}

/// Destination for remote batches
///
/// [`HttpBatchSink`] is the production implementation; anything else (an
/// in-memory recorder, a message queue producer) can be plugged in.
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Deliver one batch; any error counts as a failed attempt
    async fn send(&self, batch: &RemoteBatch) -> Result<()>;

    fn endpoint(&self) -> &str;
}

/// POSTs batches as JSON with reqwest
pub struct HttpBatchSink {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpBatchSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        let client = reqwest::Client::builder()
            .user_agent(concat!("structured_logger/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LoggerError::config("RemoteTransport", format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }
}

#[async_trait]
impl BatchSink for HttpBatchSink {
    async fn send(&self, batch: &RemoteBatch) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(batch)
            .send()
            .await
            .map_err(|e| LoggerError::remote_delivery(&self.endpoint, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(LoggerError::remote_status(&self.endpoint, status.as_u16()))
        }
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Settings for [`RemoteTransport`]
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub endpoint: String,
    /// When false, `log` is a no-op
    pub enabled: bool,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub max_retries: u32,
    pub timeout: Duration,
    /// Static labels attached to every batch
    pub labels: BTreeMap<String, String>,
}

impl RemoteConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let defaults = LoggerConfig::default();
        Self {
            endpoint: endpoint.into(),
            enabled: true,
            batch_size: defaults.batch_size,
            flush_interval: defaults.flush_interval_duration(),
            max_retries: defaults.max_retries,
            timeout: defaults.remote_timeout_duration(),
            labels: BTreeMap::new(),
        }
    }

    /// Remote settings of a logger configuration; fails without an endpoint
    pub fn from_logger_config(config: &LoggerConfig) -> Result<Self> {
        let endpoint = config
            .remote_endpoint
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| LoggerError::config("RemoteTransport", "remoteEndpoint is missing"))?;

        Ok(Self {
            endpoint,
            enabled: config.enable_remote,
            batch_size: config.batch_size,
            flush_interval: config.flush_interval_duration(),
            max_retries: config.max_retries,
            timeout: config.remote_timeout_duration(),
            labels: config.labels.clone(),
        })
    }

    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(LoggerError::config("RemoteTransport", "batchSize must be at least 1"));
        }
        if self.flush_interval.is_zero() {
            return Err(LoggerError::config("RemoteTransport", "flushInterval must be positive"));
        }
        Ok(())
    }
}

/// Delay before retry number `attempt` (1-based): 2s, 4s, 8s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.clamp(1, 16))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushTrigger {
    Timer,
    Size,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushOutcome {
    Delivered,
    Empty,
    Skipped,
    Failed,
}

type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send>>;

struct RemoteShared {
    config: RemoteConfig,
    sink: Arc<dyn BatchSink>,
    fallback: Arc<dyn Transport>,
    queue: Mutex<VecDeque<LogEntry>>,
    retry_count: AtomicU32,
    retry_pending: AtomicBool,
    closed: AtomicBool,
    /// Single-slot guard: at most one flush in flight
    flush_lock: tokio::sync::Mutex<()>,
    wake: Notify,
    scheduler: Scheduler,
    metrics: RemoteMetrics,
}

impl RemoteShared {
    async fn flush(self: &Arc<Self>, trigger: FlushTrigger) -> FlushOutcome {
        let _guard = match trigger {
            FlushTrigger::Timer | FlushTrigger::Size => {
                if self.retry_pending.load(Ordering::SeqCst) {
                    return FlushOutcome::Skipped;
                }
                match self.flush_lock.try_lock() {
                    Ok(guard) => guard,
                    Err(_) => return FlushOutcome::Skipped,
                }
            }
            FlushTrigger::Retry => {
                let guard = self.flush_lock.lock().await;
                self.retry_pending.store(false, Ordering::SeqCst);
                guard
            }
        };

        if self.closed.load(Ordering::SeqCst) && trigger != FlushTrigger::Retry {
            return FlushOutcome::Skipped;
        }

        let batch = self.peek_batch();
        if batch.is_empty() {
            return FlushOutcome::Empty;
        }
        let size = batch.len();

        match self.send(batch).await {
            Ok(()) => {
                self.commit(size);
                self.retry_count.store(0, Ordering::SeqCst);
                FlushOutcome::Delivered
            }
            Err(e) => {
                self.handle_failure(size, e);
                FlushOutcome::Failed
            }
        }
    }

    /// Clone up to `batch_size` entries from the head without removing them
    fn peek_batch(&self) -> Vec<LogEntry> {
        self.queue
            .lock()
            .iter()
            .take(self.config.batch_size)
            .cloned()
            .collect()
    }

    async fn send(&self, logs: Vec<LogEntry>) -> Result<()> {
        let batch = RemoteBatch::new(logs, self.config.labels.clone());
        self.sink.send(&batch).await
    }

    /// Remove a delivered batch from the head of the queue
    fn commit(&self, size: usize) {
        {
            let mut queue = self.queue.lock();
            let size = size.min(queue.len());
            queue.drain(..size);
        }
        self.metrics.record_delivered(size);
    }

    fn take_front(&self, size: usize) -> Vec<LogEntry> {
        let mut queue = self.queue.lock();
        let size = size.min(queue.len());
        queue.drain(..size).collect()
    }

    fn handle_failure(self: &Arc<Self>, size: usize, error: LoggerError) {
        self.metrics.record_failed_attempt();
        let attempt = self.retry_count.fetch_add(1, Ordering::SeqCst) + 1;

        if error.is_retriable() && attempt <= self.config.max_retries {
            let delay = backoff_delay(attempt);
            eprintln!(
                "[LOGGER WARNING] Remote delivery failed ({}); retry {}/{} in {}s",
                error,
                attempt,
                self.config.max_retries,
                delay.as_secs()
            );

            self.retry_pending.store(true, Ordering::SeqCst);
            if self.scheduler.schedule(delay, retry_task(Arc::clone(self))) {
                self.metrics.record_retry_scheduled();
            } else {
                // Shutting down; cleanup drains the queue
                self.retry_pending.store(false, Ordering::SeqCst);
            }
            return;
        }

        eprintln!(
            "[LOGGER ERROR] Remote delivery to {} failed after {} attempt(s) ({}); \
             emitting {} entries locally",
            self.sink.endpoint(),
            attempt,
            error,
            size
        );
        let dropped = self.take_front(size);
        self.emit_fallback(&dropped);
        self.retry_count.store(0, Ordering::SeqCst);
    }

    fn emit_fallback(&self, entries: &[LogEntry]) {
        if entries.is_empty() {
            return;
        }
        self.metrics.record_fallback(entries.len());
        for entry in entries {
            let tagged = entry.derive_with_field(DELIVERY_FAILED_KEY, true);
            if let Err(e) = self.fallback.log(&tagged) {
                eprintln!(
                    "[LOGGER ERROR] Fallback transport '{}' failed: {}",
                    self.fallback.name(),
                    e
                );
            }
        }
    }

    fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

/// Boxed so the retry future does not embed its own type
fn retry_task(shared: Arc<RemoteShared>) -> BoxedTask {
    Box::pin(async move {
        if shared.flush(FlushTrigger::Retry).await == FlushOutcome::Delivered {
            drain_full_batches(&shared, FlushTrigger::Retry).await;
        }
    })
}

async fn drain_full_batches(shared: &Arc<RemoteShared>, trigger: FlushTrigger) {
    while shared.pending() >= shared.config.batch_size {
        if shared.flush(trigger).await != FlushOutcome::Delivered {
            break;
        }
    }
}

/// Recurring flush loop: timer ticks plus size-threshold wakeups
async fn flush_worker(shared: Arc<RemoteShared>, mut cancellation: Cancellation) {
    let period = shared.config.flush_interval;
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let trigger = tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            _ = shared.wake.notified() => FlushTrigger::Size,
            _ = ticker.tick() => FlushTrigger::Timer,
        };

        if shared.flush(trigger).await == FlushOutcome::Delivered {
            drain_full_batches(&shared, trigger).await;
        }
    }
}

/// Transport that ships entries to an HTTP collector in batches
///
/// Construction needs a tokio runtime (the flush worker is spawned onto it).
/// `log` only enqueues; delivery happens on the runtime. Call
/// [`Transport::cleanup`] (usually through `Logger::cleanup`) before exit to
/// deliver or locally emit everything still queued.
///
/// # Example
///
/// ```no_run
/// use structured_logger::transports::{RemoteConfig, RemoteTransport};
/// use std::time::Duration;
///
/// # async fn run() -> structured_logger::Result<()> {
/// let remote = RemoteTransport::new(
///     RemoteConfig::new("https://logs.example.com/ingest")
///         .batch_size(100)
///         .flush_interval(Duration::from_secs(2))
///         .label("service", "checkout"),
/// )?;
/// # Ok(())
/// # }
/// ```
pub struct RemoteTransport {
    shared: Arc<RemoteShared>,
}

impl RemoteTransport {
    /// HTTP delivery with a console fallback
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let sink = HttpBatchSink::new(config.endpoint.clone(), config.timeout)?;
        let fallback = ConsoleTransport::new().structured(true).with_colors(false);
        Self::with_parts(config, Arc::new(sink), Arc::new(fallback))
    }

    pub fn from_logger_config(config: &LoggerConfig) -> Result<Self> {
        let remote = RemoteConfig::from_logger_config(config)?;
        let sink = HttpBatchSink::new(remote.endpoint.clone(), remote.timeout)?;
        let fallback = ConsoleTransport::from_config(config);
        Self::with_parts(remote, Arc::new(sink), Arc::new(fallback))
    }

    /// Full control over the delivery sink and the fallback transport
    pub fn with_parts(
        config: RemoteConfig,
        sink: Arc<dyn BatchSink>,
        fallback: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;
        let scheduler = Scheduler::current("RemoteTransport")?;
        let enabled = config.enabled;

        let shared = Arc::new(RemoteShared {
            config,
            sink,
            fallback,
            queue: Mutex::new(VecDeque::new()),
            retry_count: AtomicU32::new(0),
            retry_pending: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            flush_lock: tokio::sync::Mutex::new(()),
            wake: Notify::new(),
            scheduler,
            metrics: RemoteMetrics::new(),
        });

        if enabled {
            let cancellation = shared.scheduler.cancellation();
            shared
                .scheduler
                .spawn(flush_worker(Arc::clone(&shared), cancellation));
        }

        Ok(Self { shared })
    }

    /// Entries waiting for delivery, including a batch under retry
    pub fn pending(&self) -> usize {
        self.shared.pending()
    }

    pub fn metrics(&self) -> &RemoteMetrics {
        &self.shared.metrics
    }

    /// Consecutive failed attempts for the batch at the head of the queue
    pub fn retry_count(&self) -> u32 {
        self.shared.retry_count.load(Ordering::SeqCst)
    }

    pub fn endpoint(&self) -> &str {
        self.shared.sink.endpoint()
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.config.enabled
    }
}

#[async_trait]
impl Transport for RemoteTransport {
    fn log(&self, entry: &LogEntry) -> Result<()> {
        let shared = &self.shared;
        if !shared.config.enabled {
            return Ok(());
        }
        if shared.closed.load(Ordering::SeqCst) {
            shared.emit_fallback(std::slice::from_ref(entry));
            return Ok(());
        }

        let queued = {
            let mut queue = shared.queue.lock();
            queue.push_back(entry.clone());
            queue.len()
        };
        if queued >= shared.config.batch_size {
            shared.wake.notify_one();
        }
        Ok(())
    }

    /// Stop all timers, then deliver everything still queued
    ///
    /// Entries that cannot be delivered are emitted to the fallback
    /// transport; the delivery error is returned.
    async fn cleanup(&self) -> Result<()> {
        let shared = &self.shared;
        if shared.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        shared.scheduler.shutdown().await;
        let _guard = shared.flush_lock.lock().await;
        shared.retry_pending.store(false, Ordering::SeqCst);

        loop {
            let batch = shared.peek_batch();
            if batch.is_empty() {
                break;
            }
            let size = batch.len();

            if let Err(e) = shared.send(batch).await {
                shared.metrics.record_failed_attempt();
                let remaining = shared.take_front(usize::MAX);
                eprintln!(
                    "[LOGGER ERROR] Final remote delivery failed ({}); emitting {} entries locally",
                    e,
                    remaining.len()
                );
                shared.emit_fallback(&remaining);
                shared.retry_count.store(0, Ordering::SeqCst);
                return Err(e);
            }
            shared.commit(size);
        }

        shared.retry_count.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "remote"
    }
}

impl Drop for RemoteTransport {
    fn drop(&mut self) {
        self.shared.scheduler.cancel();
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let remaining = self.shared.take_front(usize::MAX);
        if !remaining.is_empty() {
            eprintln!(
                "[LOGGER WARNING] Remote transport dropped without cleanup; \
                 emitting {} queued entries locally",
                remaining.len()
            );
            self.shared.emit_fallback(&remaining);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn test_wire_format() {
        let mut labels = BTreeMap::new();
        labels.insert("service".to_string(), "web".to_string());
        let batch = RemoteBatch::new(vec![LogEntry::new(LogLevel::Info, "hello")], labels);

        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["logs"][0]["message"], "hello");
        assert_eq!(json["labels"]["service"], "web");
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_config_from_logger_config() {
        let config = LoggerConfig {
            enable_remote: true,
            remote_endpoint: Some("http://collector:9000/logs".to_string()),
            batch_size: 10,
            flush_interval: 100,
            ..LoggerConfig::default()
        };

        let remote = RemoteConfig::from_logger_config(&config).unwrap();
        assert_eq!(remote.batch_size, 10);
        assert_eq!(remote.flush_interval, Duration::from_millis(100));
        assert!(remote.enabled);

        let missing = LoggerConfig::default();
        assert!(RemoteConfig::from_logger_config(&missing).is_err());
    }

    #[test]
    fn test_construction_requires_runtime() {
        let result = RemoteTransport::new(RemoteConfig::new("http://localhost:1/logs"));
        assert!(matches!(result, Err(LoggerError::RuntimeUnavailable { .. })));
    }
}
