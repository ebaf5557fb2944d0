//! Response wrapper and body interpretation.
//!
//! The [`Response`] type wraps the parsed body along with metadata about the
//! exchange, making it easy to access timing information, headers, the request
//! identifier, and the raw body for debugging and observability.

use http::{HeaderMap, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

const INVALID_JSON_MESSAGE: &str = "Invalid JSON response from server";
const EMPTY_BODY_MESSAGE: &str = "No response body";

/// A successful response.
///
/// # Examples
///
/// ```no_run
/// use shoplaunch_client::Client;
///
/// # async fn example() -> Result<(), shoplaunch_client::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// let response = client.get::<serde_json::Value>("/api/catalog/").await?;
///
/// println!("Products: {}", response.data["products"]);
/// println!("Request {} took {:?}", response.request_id, response.latency);
/// println!("Attempts: {}", response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The parsed response body.
    pub data: T,

    /// The raw response body as a string.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from the first attempt until this response, including retry delays.
    pub latency: Duration,

    /// The number of attempts made for this request.
    pub attempts: usize,

    /// The `X-Request-ID` sent with the request.
    pub request_id: String,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
        request_id: String,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
            request_id,
        }
    }

    /// Maps the response data to a different type, preserving the metadata.
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
            request_id: self.request_id,
        }
    }

    /// Returns `true` if transient failures forced more than one attempt.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

/// Turns a response body into structured data.
///
/// JSON content is parsed, degrading to a message-only payload if it is
/// malformed. Anything else is wrapped as `{"message": <text>}`.
pub(crate) fn interpret_body(content_type: Option<&str>, body: &str) -> Value {
    let is_json = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));

    if is_json {
        return match serde_json::from_str(body) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse JSON response");
                json!({ "message": INVALID_JSON_MESSAGE })
            }
        };
    }

    if body.is_empty() {
        json!({ "message": EMPTY_BODY_MESSAGE })
    } else {
        json!({ "message": body })
    }
}
