//! Error types for storefront API calls.
//!
//! Every unrecoverable outcome of a request is normalized into [`Error`]. Callers
//! inspect it by [`Error::status`] and [`Error::code`] rather than by matching on
//! transport details; server-provided messages and field-level validation details
//! are preserved when the server sent them.

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

pub(crate) const FORBIDDEN_MESSAGE: &str =
    "Access forbidden. Please refresh the page and try again.";
pub(crate) const VALIDATION_MESSAGE: &str = "Validation failed.";
pub(crate) const UNKNOWN_MESSAGE: &str = "An unknown error occurred.";

/// Symbolic error code carried by every [`Error`].
///
/// The first six codes mirror what the server-facing taxonomy produces; the rest
/// describe failures that happen on the client before or after the exchange.
///
/// # Examples
///
/// ```
/// use shoplaunch_client::ErrorCode;
///
/// assert_eq!(ErrorCode::ValidationError.as_str(), "VALIDATION_ERROR");
/// assert_eq!(ErrorCode::NetworkError.to_string(), "NETWORK_ERROR");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The request was retried after a successful refresh and still got 401.
    AuthSessionExpired,
    /// The session refresh itself failed.
    AuthFailed,
    /// The server answered 403.
    Forbidden,
    /// The server answered 422.
    ValidationError,
    /// Any other non-2xx status.
    UnknownError,
    /// Transient failures exhausted the retry budget.
    NetworkError,
    /// The client or request was misconfigured.
    ConfigurationError,
    /// The request body could not be serialized.
    SerializationError,
    /// A successful body did not match the requested type.
    DeserializationError,
    /// The transport failed in a way that is not worth retrying.
    TransportError,
}

impl ErrorCode {
    /// Returns the wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthSessionExpired => "AUTH_SESSION_EXPIRED",
            ErrorCode::AuthFailed => "AUTH_FAILED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::SerializationError => "SERIALIZATION_ERROR",
            ErrorCode::DeserializationError => "DESERIALIZATION_ERROR",
            ErrorCode::TransportError => "TRANSPORT_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure that is assumed likely to succeed if the attempt is repeated.
#[derive(thiserror::Error, Debug)]
pub enum TransientFailure {
    /// The attempt did not finish before its timeout fired and was cancelled.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The connection failed or dropped before a full response was read.
    #[error("connection failed: {0}")]
    Connection(#[source] reqwest::Error),
}

/// The main error type for storefront API calls.
///
/// # Examples
///
/// ```no_run
/// use shoplaunch_client::{Client, Error, ErrorCode};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// match client.cart().add_item(&serde_json::json!({"productId": "123", "quantity": 1})).await {
///     Ok(cart) => println!("Cart: {cart}"),
///     Err(e) if e.code() == ErrorCode::ValidationError => {
///         eprintln!("Fix these fields: {:?}", e.details());
///     }
///     Err(e) if e.is_auth_failure() => eprintln!("Signed out: {e}"),
///     Err(e) => eprintln!("Request failed ({}, status {}): {e}", e.code(), e.status()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A refresh succeeded but the retried request was still unauthorized.
    #[error("Session expired")]
    SessionExpired,

    /// The session could not be refreshed after a 401.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// The server refused the request (403), usually a CSRF or permission failure.
    #[error("{message}")]
    Forbidden {
        /// Server-provided or default message
        message: String,
    },

    /// The server rejected the payload (422).
    ///
    /// `details` holds the full response body, including field-level errors.
    #[error("{message}")]
    Validation {
        /// Server-provided or default message
        message: String,
        /// The parsed response body
        details: Value,
    },

    /// Any other non-2xx status. Server errors are deliberately not retried.
    #[error("HTTP error {status}: {message}")]
    Http {
        /// The HTTP status code
        status: StatusCode,
        /// Server-provided or default message
        message: String,
        /// The parsed response body
        details: Value,
    },

    /// Transient failures exhausted the retry budget. Reported with status 0.
    #[error(
        "Network request failed after multiple attempts. Please check your connection."
    )]
    Network {
        /// Number of attempts made
        attempts: usize,
        /// The failure observed on the final attempt
        #[source]
        last_error: TransientFailure,
        /// `{"message": ...}` describing the final failure
        details: Value,
    },

    /// The transport failed in a way that retrying cannot fix.
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Invalid configuration was provided.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// A successful response body could not be decoded into the requested type.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// An invalid URL was provided or produced.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns the numeric status associated with this error.
    ///
    /// `0` is used when no server response was involved.
    ///
    /// # Examples
    ///
    /// ```
    /// use shoplaunch_client::Error;
    ///
    /// let err = Error::Forbidden { message: "nope".to_string() };
    /// assert_eq!(err.status(), 403);
    /// assert_eq!(Error::SessionExpired.status(), 401);
    /// ```
    pub fn status(&self) -> u16 {
        match self {
            Error::SessionExpired | Error::AuthenticationFailed => 401,
            Error::Forbidden { .. } => 403,
            Error::Validation { .. } => 422,
            Error::Http { status, .. } => status.as_u16(),
            Error::DeserializationFailed { status, .. } => status.as_u16(),
            Error::Network { .. }
            | Error::Transport(_)
            | Error::Configuration(_)
            | Error::SerializationFailed(_)
            | Error::InvalidUrl(_) => 0,
        }
    }

    /// Returns the symbolic code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::SessionExpired => ErrorCode::AuthSessionExpired,
            Error::AuthenticationFailed => ErrorCode::AuthFailed,
            Error::Forbidden { .. } => ErrorCode::Forbidden,
            Error::Validation { .. } => ErrorCode::ValidationError,
            Error::Http { .. } => ErrorCode::UnknownError,
            Error::Network { .. } => ErrorCode::NetworkError,
            Error::Transport(_) => ErrorCode::TransportError,
            Error::Configuration(_) | Error::InvalidUrl(_) => ErrorCode::ConfigurationError,
            Error::SerializationFailed(_) => ErrorCode::SerializationError,
            Error::DeserializationFailed { .. } => ErrorCode::DeserializationError,
        }
    }

    /// Returns the structured details payload.
    ///
    /// Server bodies for HTTP errors, and a `{"message": ...}` description of the
    /// last failure for network errors.
    pub fn details(&self) -> Option<&Value> {
        match self {
            Error::Validation { details, .. }
            | Error::Http { details, .. }
            | Error::Network { details, .. } => Some(details),
            _ => None,
        }
    }

    /// Returns `true` if this error ended the session and triggered the login redirect.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::SessionExpired | Error::AuthenticationFailed)
    }

    /// Builds the error reported once transient failures exhaust the retry budget.
    pub(crate) fn network(attempts: usize, last_error: TransientFailure) -> Self {
        let details = serde_json::json!({ "message": last_error.to_string() });
        Error::Network {
            attempts,
            last_error,
            details,
        }
    }

    /// Builds the terminal error for a non-2xx, non-401 response.
    pub(crate) fn from_status(status: StatusCode, data: Value) -> Self {
        let server_message = data
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_owned);

        match status.as_u16() {
            403 => Error::Forbidden {
                message: server_message.unwrap_or_else(|| FORBIDDEN_MESSAGE.to_string()),
            },
            422 => Error::Validation {
                message: server_message.unwrap_or_else(|| VALIDATION_MESSAGE.to_string()),
                details: data,
            },
            _ => Error::Http {
                status,
                message: server_message.unwrap_or_else(|| UNKNOWN_MESSAGE.to_string()),
                details: data,
            },
        }
    }
}

/// A specialized `Result` type for storefront API calls.
pub type Result<T> = std::result::Result<T, Error>;
