//! Basic logger usage example
//!
//! Demonstrates levels, scoped context, structured errors and timing with the
//! console transport.
//!
//! Run with: cargo run --example basic_usage

use structured_logger::prelude::*;
use structured_logger::{info, warn};

#[derive(Debug, thiserror::Error)]
#[error("inventory service unavailable")]
struct InventoryError;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Structured Logger - Basic Usage Example ===\n");

    // APP_ENV=production switches the environment stamped on every entry
    let environment = Environment::from_env_var("APP_ENV").unwrap_or(Environment::Development);
    let logger = Logger::builder()
        .level(LogLevel::Debug)
        .environment(environment)
        .default_context(LogContext::new().with_component("checkout"))
        .transport(ConsoleTransport::new())
        .build();

    println!("1. Logging at different levels:");
    logger.debug("This is a debug message");
    logger.info("This is an info message");
    logger.warn("This is a warning message");
    logger.error("This is an error message");

    println!("\n2. Scoped context:");
    let request_log = logger.with_context(LogContext::new().with_request_id("req-7f3a").with_user_id("u-42"));
    request_log.info("Cart loaded");
    info!(request_log, "Applying {} coupons", 2);
    warn!(request_log, context: LogContext::new().with_field("attempt", 2), "Payment retry");

    println!("\n3. Errors and structured fields:");
    request_log.error_with_error(
        "Could not reserve stock",
        LogContext::new().with_field("sku", "A-1001"),
        &InventoryError,
    );
    request_log
        .warn_builder()
        .message("Slow dependency")
        .field("dependency", "pricing")
        .duration_ms(812.4)
        .log();

    println!("\n4. Timing an operation:");
    let total: std::result::Result<u32, String> = request_log
        .time(
            "price calculation",
            async {
                tokio::time::sleep(std::time::Duration::from_millis(25)).await;
                Ok(4_990)
            },
            None,
        )
        .await;
    println!("   total = {:?}", total);

    let reserved: std::result::Result<(), InventoryError> = request_log
        .time_err("stock reservation", async { Err(InventoryError) }, None)
        .await;
    println!("   reserved = {:?}", reserved);

    println!("\n5. Production-style JSON output:");
    let json_logger = Logger::builder()
        .environment(Environment::Production)
        .transport(ConsoleTransport::new().structured(true))
        .build();
    json_logger.info_with_context("Order placed", LogContext::new().with_field("orderId", "o-981"));

    logger.cleanup().await?;
    println!("\n=== Example completed successfully! ===");
    Ok(())
}
