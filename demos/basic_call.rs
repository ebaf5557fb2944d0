//! Basic example walking through a storefront session.
//!
//! This example shows how to:
//! - Create a client from `SHOPLAUNCH_API_URL`
//! - Sign in and let the cookie jar pick up the session and CSRF cookies
//! - Browse the catalog with typed responses
//! - Add to the cart, which sends the CSRF token automatically
//!
//! Start the storefront backend, then run with: `cargo run --example basic_call`

use serde::{Deserialize, Serialize};
use shoplaunch_client::{ClientBuilder, Error};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Product {
    id: String,
    name: String,
    price: f64,
}

#[derive(Debug, Deserialize)]
struct Catalog {
    products: Vec<Product>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CartItem<'a> {
    product_id: &'a str,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("shoplaunch_client=debug,basic_call=info")
        .init();

    let client = ClientBuilder::from_env()?.build()?;
    println!("Talking to {}", client.base_url());

    println!("=== Sign in ===");
    let session = client
        .auth()
        .login(&Credentials {
            email: "ada@example.com",
            password: "hunter2",
        })
        .await?;
    println!("Signed in: {}", session);
    println!("CSRF token cached: {}", client.csrf_token().is_some());
    println!();

    println!("=== Browse the catalog ===");
    let response = client.get::<Catalog>("/api/catalog/").await?;
    for product in &response.data.products {
        println!("  {} - {} ({:.2})", product.id, product.name, product.price);
    }
    println!("Request ID: {}", response.request_id);
    println!("Latency: {:?}", response.latency);
    println!();

    let Some(first) = response.data.products.first() else {
        println!("Catalog is empty, nothing to add to the cart");
        return Ok(());
    };

    println!("=== Add to cart ===");
    let cart = client
        .cart()
        .add_item(&CartItem {
            product_id: &first.id,
            quantity: 1,
        })
        .await?;
    println!("Cart: {}", cart);
    println!();

    println!("=== Response metadata ===");
    let me = client.get::<serde_json::Value>("/api/auth/me").await?;
    println!("Status: {}", me.status);
    println!("Content-Type: {:?}", me.header("content-type"));
    println!("Attempts: {}", me.attempts);
    println!("Was retried: {}", me.was_retried());

    client.auth().logout().await?;
    Ok(())
}
