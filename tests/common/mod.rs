//! Shared test doubles

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use structured_logger::core::{LogEntry, LogLevel, Logger, LoggerError, Result, Transport};
use structured_logger::transports::{BatchSink, RemoteBatch};
use tokio::time::Instant;

/// Transport that keeps every entry it receives
#[derive(Default)]
pub struct CaptureTransport {
    entries: Mutex<Vec<LogEntry>>,
}

impl CaptureTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|e| e.message().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl Transport for CaptureTransport {
    fn log(&self, entry: &LogEntry) -> Result<()> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "capture"
    }
}

/// Logger at debug level writing only to `capture`
pub fn capture_logger(capture: &Arc<CaptureTransport>) -> Logger {
    Logger::builder()
        .level(LogLevel::Debug)
        .shared_transport(capture.clone())
        .build()
}

/// One `send` call seen by [`RecordingSink`]
#[derive(Debug, Clone)]
pub struct SinkCall {
    pub at: Instant,
    pub messages: Vec<String>,
    pub succeeded: bool,
}

type FailurePlan = Box<dyn Fn(usize) -> bool + Send + Sync>;

/// Batch sink recording each attempt; `fails(n)` decides whether call `n`
/// (0-based) is answered with a 503
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    attempts: AtomicUsize,
    fails: FailurePlan,
    /// Time each `send` stays in flight
    latency: Duration,
    /// Fail with a non-retriable error instead of a 503
    permanent: bool,
}

impl RecordingSink {
    pub fn with_plan(fails: impl Fn(usize) -> bool + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self::build(Box::new(fails), Duration::ZERO, false))
    }

    fn build(fails: FailurePlan, latency: Duration, permanent: bool) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            fails,
            latency,
            permanent,
        }
    }

    /// Always succeeds, but each request takes `latency` to answer
    pub fn slow(latency: Duration) -> Arc<Self> {
        Arc::new(Self::build(Box::new(|_| false), latency, false))
    }

    /// Every attempt fails with an error that retrying cannot fix
    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self::build(Box::new(|_| true), Duration::ZERO, true))
    }

    pub fn healthy() -> Arc<Self> {
        Self::with_plan(|_| false)
    }

    pub fn failing_first(n: usize) -> Arc<Self> {
        Self::with_plan(move |call| call < n)
    }

    pub fn always_failing() -> Arc<Self> {
        Self::with_plan(|_| true)
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }

    /// Messages of successful deliveries, in delivery order
    pub fn delivered(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.succeeded)
            .flat_map(|c| c.messages.clone())
            .collect()
    }
}

#[async_trait]
impl BatchSink for RecordingSink {
    async fn send(&self, batch: &RemoteBatch) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        let failed = (self.fails)(attempt);

        self.calls.lock().push(SinkCall {
            at: Instant::now(),
            messages: batch.logs.iter().map(|e| e.message().to_string()).collect(),
            succeeded: !failed,
        });

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if failed && self.permanent {
            Err(LoggerError::other("batch rejected by sink"))
        } else if failed {
            Err(LoggerError::remote_status("stub://collector", 503))
        } else {
            Ok(())
        }
    }

    fn endpoint(&self) -> &str {
        "stub://collector"
    }
}
