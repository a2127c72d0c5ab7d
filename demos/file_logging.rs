//! File logging example
//!
//! Builds a server logger from configuration: human-readable console output
//! plus a rotating JSON-lines file.
//!
//! Run with: cargo run --example file_logging

use structured_logger::prelude::*;
use structured_logger::transports::RotationPolicy;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Structured Logger - File Logging Example ===\n");

    let config = LoggerConfig {
        level: LogLevel::Debug,
        enable_file: true,
        file_path: "logs/application.log".into(),
        max_size: "1m".to_string(),
        max_files: 5,
        date_pattern: "YYYY-MM-DD".to_string(),
        zipped_archive: true,
        default_context: LogContext::new().with_component("inventory"),
        ..LoggerConfig::for_environment(Environment::Development)
    };
    config.validate()?;

    println!("1. Server logger (console + file):");
    let logger = create_logger(config, DeploymentTarget::Server);
    println!("   transports: {:?}", logger.transport_names());

    logger.info("Application started");
    logger.debug("Loading configuration...");
    logger.warn("Using default settings for some options");
    logger.error("Failed to load optional plugin");

    println!("\n2. Performing some operations:");
    for i in 1..=5 {
        let item_log = logger.with_context(LogContext::new().with_field("item", i));
        item_log.info(format!("Processing item {}/5", i));
        if i == 3 {
            item_log.warn_builder().message("Item took longer than expected").duration_ms(1520.0).log();
        }
    }

    println!("\n3. A size-rotated audit file:");
    let audit = Logger::builder()
        .transport(FileTransport::new(
            "logs/audit.log",
            RotationPolicy::new().with_max_size(64 * 1024).with_max_backups(3),
        )?)
        .build();
    for i in 0..100 {
        audit.info_with_context("Record accessed", LogContext::new().with_field("recordId", i));
    }

    logger.cleanup().await?;
    audit.cleanup().await?;

    println!("\n=== Example completed successfully! ===");
    println!("Inspect the files with: cargo run --bin logview -- logs/application.log");
    Ok(())
}
