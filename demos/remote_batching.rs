//! Remote batching example
//!
//! Starts a local collector (the client log ingest handler), then ships
//! entries to it from a client logger in batches.
//!
//! Run with: cargo run --example remote_batching

use axum::{routing::post, Router};
use std::time::Duration;
use structured_logger::adapters::axum::client_log_ingest;
use structured_logger::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("=== Structured Logger - Remote Batching Example ===\n");

    // Server side: relay client entries to the server console as JSON
    let server_logger = Logger::builder()
        .level(LogLevel::Debug)
        .environment(Environment::Production)
        .transport(ConsoleTransport::new().structured(true))
        .build();
    let app = Router::new()
        .route("/logs", post(client_log_ingest))
        .with_state(server_logger);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let endpoint = format!("http://{}/logs", listener.local_addr()?);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("collector stopped: {}", e);
        }
    });
    println!("Collector listening on {}\n", endpoint);

    // Client side: batch of 5 or every 500ms, whichever comes first
    let remote = RemoteTransport::new(
        RemoteConfig::new(endpoint)
            .batch_size(5)
            .flush_interval(Duration::from_millis(500))
            .label("app", "demo-client"),
    )?;
    let client = Logger::builder()
        .level(LogLevel::Debug)
        .default_context(LogContext::new().with_session_id("s-19"))
        .transport(remote)
        .build();

    for i in 1..=12 {
        client.info_with_context("Page view", LogContext::new().with_field("page", i));
        tokio::time::sleep(Duration::from_millis(60)).await;
    }
    client.warn("Slow render");

    // Deliver whatever is still queued before exiting
    client.cleanup().await?;

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
