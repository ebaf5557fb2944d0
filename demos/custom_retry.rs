//! Example demonstrating retry, timeout, and session settings.
//!
//! This example shows how to:
//! - Choose a fixed or exponential backoff
//! - Override the retry budget and timeout per request
//! - Upload a multipart form, rebuilt for every attempt
//! - Share one session refresh between concurrent requests
//!
//! Run with: `cargo run --example custom_retry`

use http::Method;
use shoplaunch_client::navigate::RecordingNavigator;
use shoplaunch_client::{Backoff, ClientBuilder, Error, FormData, RequestBody, RequestOptions};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("shoplaunch_client=info,custom_retry=info")
        .init();

    println!("=== Example 1: Exponential backoff ===");
    let backoff = Backoff::Exponential {
        initial_delay: Duration::from_millis(200),
        max_delay: Duration::from_secs(2),
        jitter: true,
    };
    for attempt in 1..=4 {
        println!("  delay after attempt {}: {:?}", attempt, backoff.delay_for_attempt(attempt));
    }

    let navigator = Arc::new(RecordingNavigator::new());
    let client = ClientBuilder::from_env()?
        .backoff(backoff)
        .retries(5)
        .timeout(Duration::from_secs(5))
        .navigator(navigator.clone())
        .build()?;
    println!("Client: {:?}", client);
    println!();

    println!("=== Example 2: Per-request overrides ===");
    // Dashboards are expensive; allow longer but give up sooner.
    let options = RequestOptions::new(Method::GET)
        .with_timeout(Duration::from_secs(15))
        .with_retries(1);
    match client.execute("/api/analytics/dashboard", options).await {
        Ok(response) => println!(
            "Dashboard in {:?} after {} attempt(s)",
            response.latency, response.attempts
        ),
        Err(e) => println!("Dashboard failed: {} ({})", e, e.code()),
    }
    println!();

    println!("=== Example 3: Multipart upload ===");
    let form = FormData::new()
        .text("subject", "Your order shipped")
        .file(
            "attachment",
            b"tracking: 1Z999".to_vec(),
            "tracking.txt",
            Some("text/plain"),
        );
    let options = RequestOptions::new(Method::POST).with_body(RequestBody::Form(form));
    match client.execute("/api/notifications/", options).await {
        Ok(response) => println!("Sent: {}", response.data),
        Err(e) => println!("Upload failed: {}", e),
    }
    println!();

    println!("=== Example 4: Concurrent requests, one refresh ===");
    let orders_api = client.orders();
    let cart_api = client.cart();
    let (orders, cart) = tokio::join!(orders_api.list(), cart_api.get());
    println!("Orders: {:?}", orders.map(|o| o.to_string()));
    println!("Cart: {:?}", cart.map(|c| c.to_string()));
    println!("Refreshing now: {}", client.is_refreshing());
    println!("Redirects requested: {:?}", navigator.redirects());

    Ok(())
}
