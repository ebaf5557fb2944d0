//! Example demonstrating error handling.
//!
//! This example shows how to:
//! - Branch on error codes and statuses
//! - Read field-level validation details
//! - Recognize an ended session
//! - Deal with deserialization failures and an unreachable server
//!
//! Run with: `cargo run --example error_handling`

use serde::Deserialize;
use serde_json::json;
use shoplaunch_client::navigate::FnNavigator;
use shoplaunch_client::{Backoff, ClientBuilder, Error, ErrorCode, TransientFailure};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("shoplaunch_client=info")
        .init();

    let client = ClientBuilder::from_env()?
        .navigator(Arc::new(FnNavigator::new(|url| {
            println!("  -> navigator asked to open {}", url);
        })))
        .build()?;

    println!("=== Example 1: Validation errors ===");
    match client.orders().create(&json!({"items": []})).await {
        Ok(order) => println!("Order placed: {}", order),
        Err(Error::Validation { message, details }) => {
            println!("Validation failed: {}", message);
            println!("  Details: {}", details);
        }
        Err(e) => println!("Other error: {} ({})", e, e.code()),
    }
    println!();

    println!("=== Example 2: Inspecting any error ===");
    match client.orders().get("does-not-exist").await {
        Ok(order) => println!("Found: {}", order),
        Err(e) => {
            println!("Error: {}", e);
            println!("  Code: {}", e.code());
            println!("  Status: {}", e.status());
            println!("  Details: {:?}", e.details());
        }
    }
    println!();

    println!("=== Example 3: Ended sessions ===");
    // Without signing in, the refresh fails and the navigator is sent to login.
    match client.auth().me().await {
        Ok(me) => println!("Signed in as {}", me),
        Err(e) if e.is_auth_failure() => {
            println!("Session is gone: {} ({})", e, e.code());
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 4: Deserialization failures ===");
    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct WrongSchema {
        nonexistent_field: String,
    }

    match client.get::<WrongSchema>("/api/catalog/").await {
        Ok(_) => println!("Unexpected success"),
        Err(Error::DeserializationFailed {
            raw_response,
            serde_error,
            status,
        }) => {
            println!("Deserialization failed (status {})", status);
            println!("  Serde error: {}", serde_error);
            println!(
                "  Raw response (first 200 chars): {}",
                raw_response.chars().take(200).collect::<String>()
            );
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 5: Unreachable server ===");
    let offline = ClientBuilder::new()
        .base_url("http://127.0.0.1:9")?
        .retries(2)
        .backoff(Backoff::Fixed(Duration::from_millis(200)))
        .build()?;

    match offline.catalog().list().await {
        Ok(_) => println!("Unexpected success"),
        Err(Error::Network {
            attempts,
            last_error,
            ..
        }) => {
            println!("Gave up after {} attempts", attempts);
            match last_error {
                TransientFailure::Timeout(after) => println!("  Last attempt timed out after {:?}", after),
                TransientFailure::Connection(e) => println!("  Last attempt failed to connect: {}", e),
            }
        }
        Err(e) if e.code() == ErrorCode::TransportError => println!("Transport error: {}", e),
        Err(e) => println!("Other error: {}", e),
    }

    Ok(())
}
