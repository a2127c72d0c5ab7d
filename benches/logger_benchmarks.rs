//! Criterion benchmarks for structured_logger

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use structured_logger::adapters::RequestLoggingConfig;
use structured_logger::prelude::*;
use structured_logger::transports::{BatchSink, RemoteBatch};

/// Accepts and discards entries
struct NullTransport;

impl Transport for NullTransport {
    fn log(&self, entry: &LogEntry) -> Result<()> {
        black_box(entry);
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

struct NullSink;

#[async_trait]
impl BatchSink for NullSink {
    async fn send(&self, batch: &RemoteBatch) -> Result<()> {
        black_box(batch.logs.len());
        Ok(())
    }

    fn endpoint(&self) -> &str {
        "null://"
    }
}

fn null_logger(level: LogLevel) -> Logger {
    Logger::builder().level(level).transport(NullTransport).build()
}

// ============================================================================
// Logger Creation Benchmarks
// ============================================================================

fn bench_logger_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("logger_creation");
    group.throughput(Throughput::Elements(1));

    group.bench_function("builder", |b| {
        b.iter(|| black_box(null_logger(LogLevel::Info)));
    });

    let logger = null_logger(LogLevel::Info);
    group.bench_function("with_context", |b| {
        b.iter(|| black_box(logger.with_context(LogContext::new().with_request_id("req-1"))));
    });

    group.finish();
}

// ============================================================================
// Logging Performance Benchmarks
// ============================================================================

fn bench_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("logging");
    group.throughput(Throughput::Elements(1));

    let logger = null_logger(LogLevel::Debug);

    group.bench_function("info", |b| {
        b.iter(|| logger.info(black_box("Info message")));
    });

    group.bench_function("info_with_context", |b| {
        b.iter(|| {
            logger.info_with_context(
                black_box("Info message"),
                LogContext::new().with_user_id("u-1").with_field("attempt", 2),
            )
        });
    });

    let scoped = logger.with_context(
        LogContext::new()
            .with_request_id("req-1")
            .with_trace_id("4bf92f3577b34da6a3ce929d0e0e4736")
            .with_field("method", "GET")
            .with_field("path", "/orders"),
    );
    group.bench_function("scoped_logger", |b| {
        b.iter(|| scoped.info(black_box("Scoped message")));
    });

    group.bench_function("entry_builder", |b| {
        b.iter(|| {
            logger
                .info_builder()
                .message(black_box("Built message"))
                .field("orderId", "o-1")
                .duration_ms(12.5)
                .log()
        });
    });

    group.finish();
}

fn bench_concurrent_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_logging");
    let threads = 4;
    let per_thread = 250;
    group.throughput(Throughput::Elements((threads * per_thread) as u64));

    let logger = Arc::new(null_logger(LogLevel::Info));

    group.bench_function("4_threads", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let logger = Arc::clone(&logger);
                    std::thread::spawn(move || {
                        for _ in 0..per_thread {
                            logger.info("Concurrent message");
                        }
                    })
                })
                .collect();
            for handle in handles {
                let _ = handle.join();
            }
        });
    });

    group.finish();
}

// ============================================================================
// Entry and Formatting Benchmarks
// ============================================================================

fn bench_log_entry_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_entry_creation");
    group.throughput(Throughput::Elements(1));

    group.bench_function("simple", |b| {
        b.iter(|| black_box(LogEntry::new(LogLevel::Info, black_box("Message"))));
    });

    group.bench_function("sanitized", |b| {
        b.iter(|| black_box(LogEntry::new(LogLevel::Info, black_box("line1\nline2\tend"))));
    });

    let base = LogContext::new()
        .with_component("api")
        .with_field("region", "eu-1");
    let overlay = LogContext::new().with_request_id("req-1").with_field("region", "eu-2");
    group.bench_function("context_merge", |b| {
        b.iter(|| black_box(base.merged(black_box(&overlay))));
    });

    group.finish();
}

fn bench_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatting");
    group.throughput(Throughput::Elements(1));

    let entry = LogEntry::new(LogLevel::Warn, "Slow query")
        .with_context(
            LogContext::new()
                .with_request_id("req-1")
                .with_field("table", "orders")
                .with_field("rows", 1200),
        )
        .with_duration(812.5);

    let human = ConsoleTransport::new().with_colors(false);
    group.bench_function("console_human", |b| {
        b.iter(|| black_box(human.format(black_box(&entry))));
    });

    let structured = ConsoleTransport::new().structured(true);
    group.bench_function("console_json", |b| {
        b.iter(|| black_box(structured.format(black_box(&entry))));
    });

    group.bench_function("serde_json", |b| {
        b.iter(|| black_box(serde_json::to_string(black_box(&entry))));
    });

    group.finish();
}

fn bench_level_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_filtering");
    group.throughput(Throughput::Elements(1));

    let logger = null_logger(LogLevel::Error);

    group.bench_function("filtered_debug", |b| {
        b.iter(|| logger.debug(black_box("Filtered message")));
    });

    group.bench_function("passed_error", |b| {
        b.iter(|| logger.error(black_box("Passed message")));
    });

    group.finish();
}

// ============================================================================
// Request Logging Benchmarks
// ============================================================================

fn bench_redaction(c: &mut Criterion) {
    let mut group = c.benchmark_group("redaction");
    group.throughput(Throughput::Elements(1));

    let config = RequestLoggingConfig::default();
    let body = json!({
        "user": {"name": "ann", "password": "hunter2"},
        "items": [{"sku": "a-1", "qty": 2}, {"sku": "b-7", "qty": 1}],
        "payment": {"creditCard": "4111111111111111", "currency": "EUR"}
    });

    group.bench_function("nested_body", |b| {
        b.iter(|| black_box(config.redact(black_box(&body))));
    });

    group.bench_function("query", |b| {
        b.iter(|| black_box(config.redact_query(black_box("page=2&token=abc&q=shoes"))));
    });

    group.finish();
}

// ============================================================================
// Remote Transport Benchmarks
// ============================================================================

fn bench_remote_enqueue(c: &mut Criterion) {
    let mut group = c.benchmark_group("remote_transport");
    group.throughput(Throughput::Elements(1));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("Failed to build runtime");
    let _guard = runtime.enter();

    let remote = RemoteTransport::with_parts(
        RemoteConfig::new("null://")
            .batch_size(100)
            .flush_interval(Duration::from_millis(10)),
        Arc::new(NullSink),
        Arc::new(NullTransport),
    )
    .expect("Failed to build remote transport");
    let logger = Logger::builder().transport(remote).build();

    group.bench_function("enqueue", |b| {
        b.iter(|| logger.info(black_box("Remote message")));
    });

    group.finish();
    let _ = runtime.block_on(logger.cleanup());
}

criterion_group!(
    benches,
    bench_logger_creation,
    bench_logging,
    bench_concurrent_logging,
    bench_log_entry_creation,
    bench_formatting,
    bench_level_filtering,
    bench_redaction,
    bench_remote_enqueue,
);
criterion_main!(benches);
