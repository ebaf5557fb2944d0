//! Per-request options and request bodies.

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Options for an individual request.
///
/// Anything left unset falls back to the client's defaults: `GET`, the client
/// timeout (30 seconds unless configured), and the client retry budget (3 unless
/// configured).
///
/// # Examples
///
/// ```
/// use shoplaunch_client::RequestOptions;
/// use http::Method;
/// use std::time::Duration;
///
/// let options = RequestOptions::new(Method::POST)
///     .with_json(&serde_json::json!({"productId": "123", "quantity": 1}))?
///     .with_header("X-Client-Version", "1.4.0")?
///     .with_timeout(Duration::from_secs(5))
///     .with_retries(1);
/// # Ok::<(), shoplaunch_client::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// The HTTP method.
    pub method: Method,

    /// Caller headers, merged over the client's own `Content-Type` and request-id headers.
    pub headers: HeaderMap,

    /// Optional request body.
    pub body: Option<RequestBody>,

    /// Per-attempt timeout. `None` uses the client default.
    pub timeout: Option<Duration>,

    /// Number of retries for transient failures. `None` uses the client default.
    pub retries: Option<usize>,

    /// Query parameters appended to the endpoint.
    pub query_params: Vec<(String, String)>,

    /// Set once the request has been re-issued after a session refresh.
    pub(crate) auth_retry: bool,
}

impl RequestOptions {
    /// Creates options for the given method with everything else defaulted.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
            retries: None,
            query_params: Vec::new(),
            auth_retry: false,
        }
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, crate::Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| crate::Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| crate::Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets a structured body, serialized to JSON text when sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, crate::Error> {
        let value = serde_json::to_value(body)
            .map_err(|e| crate::Error::SerializationFailed(e.to_string()))?;
        self.body = Some(RequestBody::Json(value));
        Ok(self)
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Overrides the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the retry budget for transient failures.
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Returns a copy marked as the single post-refresh retry.
    pub(crate) fn for_auth_retry(&self) -> Self {
        Self {
            auth_retry: true,
            ..self.clone()
        }
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

/// A request body.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// A structured value, sent as JSON text with `Content-Type: application/json`.
    Json(Value),

    /// Pre-serialized text, sent untouched.
    Text(String),

    /// A multipart form. No `Content-Type` is forced so the transport can set
    /// its own boundary.
    Form(FormData),
}

impl RequestBody {
    pub(crate) fn is_form(&self) -> bool {
        matches!(self, RequestBody::Form(_))
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<FormData> for RequestBody {
    fn from(form: FormData) -> Self {
        RequestBody::Form(form)
    }
}

/// A reusable description of a multipart form.
///
/// `reqwest` forms are consumed when sent, so the client rebuilds one from this
/// description on every attempt.
///
/// # Examples
///
/// ```
/// use shoplaunch_client::FormData;
///
/// let form = FormData::new()
///     .text("productId", "123")
///     .file("image", b"\x89PNG".to_vec(), "front.png", Some("image/png"));
/// assert_eq!(form.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FormData {
    parts: Vec<(String, FormPart)>,
}

#[derive(Debug, Clone)]
enum FormPart {
    Text(String),
    File {
        bytes: Vec<u8>,
        file_name: String,
        mime: Option<String>,
    },
}

impl FormData {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormPart::Text(value.into())));
        self
    }

    /// Adds a file field.
    pub fn file(
        mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
        file_name: impl Into<String>,
        mime: Option<&str>,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormPart::File {
                bytes,
                file_name: file_name.into(),
                mime: mime.map(str::to_owned),
            },
        ));
        self
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns `true` if the form has no fields.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub(crate) fn to_multipart(&self) -> Result<reqwest::multipart::Form, crate::Error> {
        let mut form = reqwest::multipart::Form::new();
        for (name, part) in &self.parts {
            form = match part {
                FormPart::Text(value) => form.text(name.clone(), value.clone()),
                FormPart::File {
                    bytes,
                    file_name,
                    mime,
                } => {
                    let mut part =
                        reqwest::multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                    if let Some(mime) = mime {
                        part = part.mime_str(mime).map_err(|e| {
                            crate::Error::Configuration(format!("Invalid MIME type: {}", e))
                        })?;
                    }
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }
}

/// Returns `true` for methods that carry no side effects and are exempt from CSRF protection.
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}
