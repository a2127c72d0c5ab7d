//! Integration tests for the logger
//!
//! These tests verify:
//! - Log injection prevention
//! - File transport record format and rotation
//! - Deployment-target composition from configuration
//! - Context propagation
//! - Error capture and timing
//! - Transport isolation and cleanup

mod common;

use common::{capture_logger, CaptureTransport};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use structured_logger::core::{keys, LogEntry, LoggerError, Result, Transport};
use structured_logger::transports::{FileTransport, RotationPeriod, RotationPolicy};
use structured_logger::{
    create_logger, create_logger_with_provider, DeploymentTarget, Environment, FieldValue,
    LogContext, LogLevel, Logger, LoggerConfig,
};
use tempfile::TempDir;

fn read_records(path: &std::path::Path) -> Vec<Value> {
    fs::read_to_string(path)
        .expect("Failed to read log file")
        .lines()
        .map(|line| serde_json::from_str(line).expect("log line is not JSON"))
        .collect()
}

fn plain_policy() -> RotationPolicy {
    RotationPolicy::new()
        .with_period(RotationPeriod::Never)
        .with_compression(false)
}

#[test]
fn test_log_injection_prevention() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("injection.log");

    let logger = Logger::builder()
        .transport(FileTransport::new(&log_file, plain_policy()).expect("Failed to open file"))
        .build();

    let malicious_message = "User login\nERROR [2024-10-17] Fake error injected\nINFO Continuation";
    logger.info(malicious_message);

    let content = fs::read_to_string(&log_file).expect("Failed to read log file");
    assert_eq!(content.lines().count(), 1, "Log should be a single line");

    let records = read_records(&log_file);
    assert_eq!(
        records[0]["message"],
        "User login\\nERROR [2024-10-17] Fake error injected\\nINFO Continuation"
    );
}

#[test]
fn test_file_record_format() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("app.log");

    let logger = Logger::builder()
        .level(LogLevel::Debug)
        .environment(Environment::Production)
        .default_context(LogContext::new().with_component("billing"))
        .transport(FileTransport::new(&log_file, plain_policy()).expect("Failed to open file"))
        .build();

    let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "db timeout");
    logger.error_with_error(
        "charge failed",
        LogContext::new().with_user_id("u-1").with_field("amount", 1299),
        &err,
    );

    let records = read_records(&log_file);
    assert_eq!(records.len(), 1);
    let record = &records[0];

    assert_eq!(record["level"], "error");
    assert_eq!(record["message"], "charge failed");
    assert!(record["timestamp"].as_str().unwrap().ends_with('Z'));
    assert_eq!(record["data"]["component"], "billing");
    assert_eq!(record["data"]["userId"], "u-1");
    assert_eq!(record["data"]["amount"], 1299);
    assert_eq!(record["data"]["environment"], "production");
    assert_eq!(record["data"]["error"]["message"], "db timeout");
}

#[test]
fn test_file_size_rotation_keeps_backups() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("rotate.log");

    let policy = plain_policy().with_max_size(512).with_max_backups(2);
    let logger = Logger::builder()
        .transport(FileTransport::new(&log_file, policy).expect("Failed to open file"))
        .build();

    for i in 0..60 {
        logger.info(format!("entry number {} with some padding to fill the file", i));
    }

    assert!(log_file.exists());
    assert!(temp_dir.path().join("rotate.log.1").exists());
    assert!(temp_dir.path().join("rotate.log.2").exists());
    assert!(!temp_dir.path().join("rotate.log.3").exists());
    // Rotation happens once the threshold is reached, so one line may spill over
    assert!(fs::metadata(&log_file).unwrap().len() < 1024);
}

#[test]
fn test_server_and_client_composition() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = LoggerConfig {
        enable_console: true,
        enable_file: true,
        file_path: temp_dir.path().join("server.log"),
        ..LoggerConfig::for_environment(Environment::Test)
    };

    let server = create_logger(config.clone(), DeploymentTarget::Server);
    assert_eq!(server.transport_names(), vec!["console", "file"]);

    let client = create_logger(config, DeploymentTarget::Client);
    assert_eq!(client.transport_names(), vec!["console"]);
}

#[test]
fn test_unusable_remote_is_skipped() {
    // No runtime and no endpoint: the console transport still works
    let config = LoggerConfig {
        enable_remote: true,
        remote_endpoint: None,
        ..LoggerConfig::for_environment(Environment::Test)
    };

    let logger = create_logger(config, DeploymentTarget::Client);
    assert_eq!(logger.transport_names(), vec!["console"]);
}

#[test]
fn test_config_file_drives_logger() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("from-config.log");
    let config_path = temp_dir.path().join("logger.toml");

    let mut file = fs::File::create(&config_path).expect("Failed to create config");
    writeln!(
        file,
        r#"
level = "warn"
environment = "staging"
enableConsole = false
enableFile = true
filePath = "{}"
maxSize = "1m"
maxFiles = 3
datePattern = ""

[defaultContext]
service = "inventory"
"#,
        log_file.display().to_string().replace('\\', "\\\\")
    )
    .expect("Failed to write config");

    let config = LoggerConfig::from_file(&config_path).expect("Failed to load config");
    assert_eq!(config.level, LogLevel::Warn);
    assert_eq!(config.environment, Environment::from_name("staging"));

    let logger = create_logger(config, DeploymentTarget::Server);
    logger.info("filtered out");
    logger.warn("disk at 91%");

    let records = read_records(&log_file);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["message"], "disk at 91%");
    assert_eq!(records[0]["data"]["service"], "inventory");
    assert_eq!(records[0]["data"]["environment"], "staging");
}

#[test]
fn test_invalid_config_file_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("logger.json");
    fs::write(&config_path, r#"{"batchSize": 0}"#).expect("Failed to write config");

    let err = LoggerConfig::from_file(&config_path).unwrap_err();
    assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

    fs::write(&config_path, "{not json").expect("Failed to write config");
    let err = LoggerConfig::from_file(&config_path).unwrap_err();
    assert!(matches!(err, LoggerError::ConfigParse { .. }));
}

#[test]
fn test_context_propagation_layers() {
    let capture = CaptureTransport::new();
    let config = LoggerConfig {
        level: LogLevel::Debug,
        enable_console: false,
        default_context: LogContext::new()
            .with_component("api")
            .with_field("region", "eu-1"),
        ..LoggerConfig::default()
    };

    let logger = Logger::builder()
        .config(config)
        .context_provider(|| LogContext::new().with_trace_id("trace-abc").with_field("region", "eu-2"))
        .shared_transport(capture.clone())
        .build();

    let scoped = logger.with_context(LogContext::new().with_request_id("req-1"));
    scoped.info_with_context("handled", LogContext::new().with_field("region", "eu-3"));
    logger.info("unscoped");

    let entries = capture.entries();
    let handled = &entries[0];
    assert_eq!(handled.context().get("region"), Some(&FieldValue::from("eu-3")));
    assert_eq!(handled.context().get(keys::TRACE_ID), Some(&FieldValue::from("trace-abc")));
    assert_eq!(handled.context().get(keys::REQUEST_ID), Some(&FieldValue::from("req-1")));
    assert_eq!(handled.context().get(keys::COMPONENT), Some(&FieldValue::from("api")));

    let unscoped = &entries[1];
    assert_eq!(unscoped.context().get("region"), Some(&FieldValue::from("eu-2")));
    assert!(!unscoped.context().contains_key(keys::REQUEST_ID));
}

#[test]
fn test_factory_with_provider() {
    let config = LoggerConfig {
        enable_console: false,
        ..LoggerConfig::for_environment(Environment::Development)
    };
    let logger = create_logger_with_provider(config, DeploymentTarget::Client, || {
        LogContext::new().with_span_id("span-1")
    });

    assert!(logger.transport_names().is_empty());
    assert!(logger.is_enabled(LogLevel::Debug));
    logger.debug("no transports, no panic");
    assert_eq!(logger.metrics().total_logged(), 1);
}

#[derive(Debug, thiserror::Error)]
#[error("checkout failed")]
struct CheckoutError {
    #[source]
    source: std::io::Error,
}

#[test]
fn test_error_chain_captured() {
    let capture = CaptureTransport::new();
    let logger = capture_logger(&capture);

    let err = CheckoutError {
        source: std::io::Error::new(std::io::ErrorKind::ConnectionReset, "socket closed"),
    };
    logger
        .error_builder()
        .message("order not placed")
        .field("orderId", "o-17")
        .error(&err)
        .log();

    let entry = &capture.entries()[0];
    let error = entry.error().expect("error info missing");
    assert_eq!(error.kind, "CheckoutError");
    assert_eq!(error.message, "checkout failed");
    assert_eq!(error.causes, vec!["socket closed".to_string()]);
    assert_eq!(entry.context().get("orderId"), Some(&FieldValue::from("o-17")));
}

#[tokio::test]
async fn test_timed_operations() {
    let capture = CaptureTransport::new();
    let logger = capture_logger(&capture);

    let value: std::result::Result<u32, String> = logger
        .time(
            "load profile",
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(7)
            },
            Some(LogContext::new().with_user_id("u-9")),
        )
        .await;
    assert_eq!(value, Ok(7));

    let failed: std::result::Result<(), String> = logger
        .time("sync cart", async { Err("conflict".to_string()) }, None)
        .await;
    assert!(failed.is_err());

    let entries = capture.entries();
    assert_eq!(entries[0].message(), "load profile completed");
    assert_eq!(entries[0].level(), LogLevel::Info);
    assert!(entries[0].duration().unwrap() >= 20.0);
    assert_eq!(entries[0].context().get(keys::USER_ID), Some(&FieldValue::from("u-9")));

    assert_eq!(entries[1].message(), "sync cart failed");
    assert_eq!(entries[1].level(), LogLevel::Error);
    assert_eq!(entries[1].error().map(|e| e.message.as_str()), Some("conflict"));
}

#[test]
fn test_start_timer_measures_elapsed() {
    let logger = Logger::new();
    let elapsed = logger.start_timer();
    std::thread::sleep(Duration::from_millis(15));
    let first = elapsed();
    assert!(first >= 15.0);
    assert!(elapsed() >= first);
}

struct RejectingTransport;

impl Transport for RejectingTransport {
    fn log(&self, _entry: &LogEntry) -> Result<()> {
        Err(LoggerError::writer("disk full"))
    }

    fn name(&self) -> &str {
        "rejecting"
    }
}

#[test]
fn test_failing_transport_does_not_block_others() {
    let capture = CaptureTransport::new();
    let logger = Logger::builder()
        .transport(RejectingTransport)
        .shared_transport(capture.clone())
        .build();

    logger.info("still delivered");
    logger.warn("also delivered");

    assert_eq!(capture.messages(), vec!["still delivered", "also delivered"]);
    assert_eq!(logger.metrics().transport_failures(), 2);
    assert_eq!(logger.metrics().total_logged(), 2);
}

#[test]
fn test_cleanup_flushes_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("cleanup.log");
    let capture = CaptureTransport::new();

    let logger = Logger::builder()
        .transport(FileTransport::new(&log_file, plain_policy()).expect("Failed to open file"))
        .shared_transport(capture.clone())
        .build();

    logger.info("before shutdown");
    tokio_test::block_on(logger.cleanup()).expect("cleanup failed");

    assert_eq!(read_records(&log_file).len(), 1);
    assert_eq!(capture.len(), 1);
}

#[test]
fn test_concurrent_logging_from_threads() {
    let capture = CaptureTransport::new();
    let logger = capture_logger(&capture);

    let handles: Vec<_> = (0..8)
        .map(|thread| {
            let logger = logger.with_context(LogContext::new().with_field("thread", thread));
            std::thread::spawn(move || {
                for i in 0..100 {
                    logger.info(format!("t{} m{}", thread, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("logging thread panicked");
    }

    assert_eq!(capture.len(), 800);
    let entries: Vec<LogEntry> = capture.entries();
    for thread in 0..8i64 {
        let own: Vec<&str> = entries
            .iter()
            .filter(|e| e.context().get("thread") == Some(&FieldValue::Int(thread)))
            .map(LogEntry::message)
            .collect();
        let expected: Vec<String> = (0..100).map(|i| format!("t{} m{}", thread, i)).collect();
        assert_eq!(own, expected, "per-thread order must be preserved");
    }
}

#[test]
fn test_shared_logger_across_clones() {
    let capture = CaptureTransport::new();
    let logger = Arc::new(capture_logger(&capture));
    let clone = (*logger).clone();

    logger.info("from original");
    clone.info("from clone");

    assert_eq!(capture.len(), 2);
    assert_eq!(logger.metrics().total_logged(), 2);
}
