//! # shoplaunch-client - resilient API client for the ShopLaunch storefront
//!
//! Every call the storefront makes to its backend goes through one [`Client`].
//! The client attaches request identifiers and anti-forgery tokens, enforces
//! per-attempt timeouts, retries transient failures, refreshes an expired
//! session exactly once no matter how many requests notice it, and normalizes
//! every failure into a single [`Error`] type.
//!
//! ## Quick Start
//!
//! ```no_run
//! use shoplaunch_client::ClientBuilder;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), shoplaunch_client::Error> {
//!     // Base URL from SHOPLAUNCH_API_URL, or http://localhost:8000
//!     let client = ClientBuilder::from_env()?.build()?;
//!
//!     client.auth().login(&json!({"email": "ada@example.com", "password": "hunter2"})).await?;
//!
//!     let products = client.catalog().list().await?;
//!     println!("Products: {}", products["products"]);
//!
//!     // POSTs carry the X-CSRF-Token header read from the csrf_token cookie
//!     let cart = client.cart().add_item(&json!({"productId": "123", "quantity": 1})).await?;
//!     println!("Cart: {cart}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## What happens to a request
//!
//! - **Headers** - `Content-Type: application/json` (unless the body is a
//!   multipart form), a fresh `X-Request-ID`, caller headers on top, and
//!   `X-CSRF-Token` for anything other than GET/HEAD/OPTIONS when a token is known.
//! - **Timeouts** - each attempt is cancelled after its timeout (30s by default).
//! - **Retries** - network failures and timeouts are retried (3 times by default,
//!   1s apart). HTTP error statuses are never retried, 5xx included.
//! - **401** - the session is refreshed via `POST /api/auth/refresh` (shared by
//!   every request that hit 401 meanwhile) and the request is retried once. If
//!   that does not work the [`navigate::Navigator`] is sent to
//!   `/login?session_expired=true`.
//!
//! ## Error Handling
//!
//! ```no_run
//! use shoplaunch_client::{Client, Error, ErrorCode};
//!
//! # async fn example(client: Client) {
//! match client.orders().create(&serde_json::json!({"items": []})).await {
//!     Ok(order) => println!("Order placed: {order}"),
//!     Err(Error::Validation { message, details }) => {
//!         eprintln!("{message}: {details}");
//!     }
//!     Err(e) if e.code() == ErrorCode::NetworkError => {
//!         eprintln!("Offline? {e}");
//!     }
//!     Err(e) => eprintln!("{} (status {}): {e}", e.code(), e.status()),
//! }
//! # }
//! ```

mod client;
pub mod csrf;
mod error;
pub mod navigate;
mod options;
pub mod refresh;
mod response;
pub mod retry;
pub mod services;

pub use client::{
    generate_request_id, Client, ClientBuilder, BASE_URL_ENV, CSRF_HEADER, DEFAULT_BASE_URL,
    DEFAULT_TIMEOUT, REFRESH_PATH, REQUEST_ID_HEADER,
};
pub use error::{Error, ErrorCode, Result, TransientFailure};
pub use options::{is_safe_method, FormData, RequestBody, RequestOptions};
pub use refresh::RefreshOutcome;
pub use response::Response;
pub use retry::Backoff;
