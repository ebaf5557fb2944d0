//! The request engine: headers, timeouts, retry, and session refresh.
//!
//! The [`Client`] type is the single chokepoint for every call to the storefront
//! API. Use [`ClientBuilder`] to configure and create clients.

use crate::{
    csrf::{CookieSource, CsrfTokenCache, DEFAULT_CSRF_TTL},
    error::TransientFailure,
    navigate::{Navigator, NoopNavigator, LOGIN_REDIRECT},
    options::{is_safe_method, RequestBody, RequestOptions},
    refresh::{RefreshCoordinator, RefreshOutcome},
    response::interpret_body,
    retry::{Backoff, DEFAULT_RETRIES},
    Error, Response, Result,
};
use http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use reqwest::cookie::Jar;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;
use uuid::Uuid;

/// Base origin used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment variable read by [`ClientBuilder::from_env`].
pub const BASE_URL_ENV: &str = "SHOPLAUNCH_API_URL";

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Endpoint used to refresh an expired session.
pub const REFRESH_PATH: &str = "/api/auth/refresh";

/// Header carrying the per-request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header carrying the anti-forgery token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Generates a fresh UUIDv4 request identifier.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// The resilient storefront API client.
///
/// The client is designed to be cloned and shared. Clones share the connection
/// pool, the cookie jar, the CSRF cache, and the session-refresh slot, so
/// concurrent 401s across clones still trigger a single refresh.
///
/// # Examples
///
/// ```no_run
/// use shoplaunch_client::{Client, RequestOptions};
/// use http::Method;
///
/// # async fn example() -> Result<(), shoplaunch_client::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// // Anything that goes over the wire goes through `execute`
/// let products = client.execute("/api/catalog/", RequestOptions::new(Method::GET)).await?;
/// println!("Catalog: {}", products.data);
///
/// // Verb helpers decode into your own types
/// let cart = client
///     .post::<_, serde_json::Value>("/api/cart/items", &serde_json::json!({"productId": "123", "quantity": 1}))
///     .await?;
/// println!("Cart now: {}", cart.data);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: Url,
    default_headers: HeaderMap,
    backoff: Backoff,
    timeout: Duration,
    retries: usize,
    cookie_jar: Arc<Jar>,
    cookie_source: Arc<dyn CookieSource>,
    csrf_cache: CsrfTokenCache,
    refresh: Arc<RefreshCoordinator>,
    navigator: Arc<dyn Navigator>,
    refresh_path: String,
    login_redirect: String,
}

/// What a single attempt produced.
enum Attempt {
    Success(Response<Value>),
    Unauthorized,
    Transient(TransientFailure),
    Terminal(Error),
}

/// What a request produced once transient failures were retried.
enum Sent {
    Response(Response<Value>),
    Unauthorized,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Executes a request and returns the parsed body.
    ///
    /// A 401 triggers one coordinated session refresh followed by a single
    /// retry of the request. Network failures and timeouts are retried up to the
    /// retry budget. Every other non-2xx status fails immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionExpired`] or [`Error::AuthenticationFailed`] after
    /// redirecting to the login page, [`Error::Network`] once the retry budget is
    /// spent, and the status-specific variants for other failures.
    pub async fn execute(&self, endpoint: &str, options: RequestOptions) -> Result<Response<Value>> {
        if let Sent::Response(response) = self.send_with_retries(endpoint, &options).await? {
            return Ok(response);
        }

        tracing::info!(
            method = %options.method,
            endpoint = %endpoint,
            "Unauthorized - refreshing session"
        );

        if self.refresh_session().await == RefreshOutcome::Failed {
            self.end_session();
            return Err(Error::AuthenticationFailed);
        }

        match self
            .send_with_retries(endpoint, &options.for_auth_retry())
            .await?
        {
            Sent::Response(response) => Ok(response),
            Sent::Unauthorized => {
                tracing::error!(endpoint = %endpoint, "Still unauthorized after session refresh");
                self.end_session();
                Err(Error::SessionExpired)
            }
        }
    }

    /// Executes a request and decodes the body into `Res`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use shoplaunch_client::{Client, RequestOptions};
    /// use http::Method;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Order { id: String, total: f64 }
    ///
    /// # async fn example() -> Result<(), shoplaunch_client::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// let options = RequestOptions::new(Method::GET).with_query_param("expand", "items");
    /// let order = client.call::<Order>("/api/orders/o-1", options).await?;
    /// println!("Order {} totals {}", order.data.id, order.data.total);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call<Res>(&self, endpoint: &str, options: RequestOptions) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        let response = self.execute(endpoint, options).await?;
        let decoded = Res::deserialize(&response.data);

        match decoded {
            Ok(data) => Ok(response.map(|_| data)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    raw_response = %response.raw_body,
                    "Failed to deserialize response"
                );

                Err(Error::DeserializationFailed {
                    raw_response: response.raw_body,
                    serde_error: e.to_string(),
                    status: response.status,
                })
            }
        }
    }

    /// Refreshes the session, sharing any refresh already in flight.
    pub async fn refresh_session(&self) -> RefreshOutcome {
        let client = self.clone();
        self.inner
            .refresh
            .run(move || async move { client.send_refresh().await })
            .await
    }

    /// Returns `true` while a session refresh is outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.inner.refresh.is_refreshing()
    }

    /// Returns the anti-forgery token, reading the cookie jar if the cache is stale.
    pub fn csrf_token(&self) -> Option<String> {
        self.inner
            .csrf_cache
            .get(self.inner.cookie_source.as_ref(), &self.inner.base_url)
    }

    /// Forgets the cached anti-forgery token.
    pub fn clear_csrf_cache(&self) {
        self.inner.csrf_cache.invalidate();
    }

    /// Returns the cookie jar shared with the transport.
    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.inner.cookie_jar
    }

    /// Returns the base origin every endpoint is appended to.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Sends one logical request, retrying transient failures within the budget.
    ///
    /// A post-refresh retry gets no transient retries of its own.
    async fn send_with_retries(&self, endpoint: &str, options: &RequestOptions) -> Result<Sent> {
        let url = self.endpoint_url(endpoint, &options.query_params)?;
        let request_id = generate_request_id();
        let headers = self.request_headers(options, &request_id)?;
        let timeout = options.timeout.unwrap_or(self.inner.timeout);
        let retries = if options.auth_retry {
            0
        } else {
            options.retries.unwrap_or(self.inner.retries)
        };

        let start_time = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            tracing::debug!(
                method = %options.method,
                url = %url,
                attempt = attempt,
                request_id = %request_id,
                "Executing HTTP request"
            );

            match self.attempt(&url, options, &headers, timeout).await {
                Attempt::Success(response) => {
                    return Ok(Sent::Response(Response {
                        latency: start_time.elapsed(),
                        attempts: attempt,
                        request_id,
                        ..response
                    }));
                }
                Attempt::Unauthorized => return Ok(Sent::Unauthorized),
                Attempt::Terminal(e) => return Err(e),
                Attempt::Transient(failure) => {
                    tracing::warn!(
                        error = %failure,
                        method = %options.method,
                        url = %url,
                        "Request failed (attempt {}/{})",
                        attempt,
                        retries + 1
                    );

                    if attempt > retries {
                        return Err(Error::network(attempt, failure));
                    }

                    let delay = self.inner.backoff.delay_for_attempt(attempt);
                    tracing::info!(
                        delay_ms = delay.as_millis(),
                        attempt = attempt,
                        "Retrying request after delay"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Executes a single attempt and classifies its outcome.
    async fn attempt(
        &self,
        url: &Url,
        options: &RequestOptions,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Attempt {
        let mut request = self
            .inner
            .http_client
            .request(options.method.clone(), url.clone())
            .headers(headers.clone());

        request = match &options.body {
            None => request,
            Some(RequestBody::Json(value)) => match serde_json::to_string(value) {
                Ok(text) => request.body(text),
                Err(e) => return Attempt::Terminal(Error::SerializationFailed(e.to_string())),
            },
            Some(RequestBody::Text(text)) => request.body(text.clone()),
            Some(RequestBody::Form(form)) => match form.to_multipart() {
                Ok(form) => request.multipart(form),
                Err(e) => return Attempt::Terminal(e),
            },
        };

        let sent_at = Instant::now();
        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, headers, body))
        };

        // Dropping the exchange on timeout cancels the in-flight request.
        let (status, response_headers, raw_body) =
            match tokio::time::timeout(timeout, exchange).await {
                Ok(Ok(parts)) => parts,
                Ok(Err(e)) => return classify_transport_error(e, timeout),
                Err(_) => return Attempt::Transient(TransientFailure::Timeout(timeout)),
            };

        tracing::info!(
            status = status.as_u16(),
            latency_ms = sent_at.elapsed().as_millis(),
            "Received HTTP response"
        );

        let content_type = response_headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let data = interpret_body(content_type, &raw_body);

        if status.is_success() {
            return Attempt::Success(Response::new(
                data,
                raw_body,
                status,
                response_headers,
                sent_at.elapsed(),
                1,
                String::new(),
            ));
        }

        if status == StatusCode::UNAUTHORIZED {
            return Attempt::Unauthorized;
        }

        if status.is_client_error() {
            tracing::error!(status = status.as_u16(), response = %raw_body, "Client error (4xx)");
        } else {
            tracing::warn!(status = status.as_u16(), response = %raw_body, "Server error");
        }

        Attempt::Terminal(Error::from_status(status, data))
    }

    /// Issues the refresh call. Never retried; anything but 2xx is a failure.
    async fn send_refresh(&self) -> RefreshOutcome {
        let options = RequestOptions::new(Method::POST);
        let request_id = generate_request_id();

        let prepared = self
            .endpoint_url(&self.inner.refresh_path, &[])
            .and_then(|url| {
                let headers = self.request_headers(&options, &request_id)?;
                Ok((url, headers))
            });
        let (url, headers) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!(error = %e, "Session refresh could not be built");
                return RefreshOutcome::Failed;
            }
        };

        tracing::debug!(url = %url, request_id = %request_id, "Refreshing session");

        let request = self.inner.http_client.post(url).headers(headers).send();
        match tokio::time::timeout(self.inner.timeout, request).await {
            Ok(Ok(response)) if response.status().is_success() => {
                tracing::info!(status = response.status().as_u16(), "Session refreshed");
                RefreshOutcome::Refreshed
            }
            Ok(Ok(response)) => {
                tracing::error!(
                    status = response.status().as_u16(),
                    "Session refresh rejected"
                );
                RefreshOutcome::Failed
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Session refresh failed");
                RefreshOutcome::Failed
            }
            Err(_) => {
                tracing::error!(
                    timeout_ms = self.inner.timeout.as_millis(),
                    "Session refresh timed out"
                );
                RefreshOutcome::Failed
            }
        }
    }

    fn end_session(&self) {
        tracing::warn!(url = %self.inner.login_redirect, "Session ended - redirecting to login");
        self.inner.navigator.redirect_to(&self.inner.login_redirect);
    }

    fn endpoint_url(&self, endpoint: &str, query_params: &[(String, String)]) -> Result<Url> {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{}{}", base, endpoint))?;

        if !query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query_params {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Builds the headers shared by every attempt of one logical request.
    fn request_headers(&self, options: &RequestOptions, request_id: &str) -> Result<HeaderMap> {
        let mut headers = self.inner.default_headers.clone();

        if !options.body.as_ref().is_some_and(RequestBody::is_form) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let request_id = HeaderValue::from_str(request_id)
            .map_err(|e| Error::Configuration(format!("Invalid request id: {}", e)))?;
        headers.insert(REQUEST_ID_HEADER, request_id);

        headers.extend(options.headers.clone());

        if !is_safe_method(&options.method) {
            if let Some(token) = self.csrf_token() {
                match HeaderValue::from_str(&token) {
                    Ok(value) => {
                        headers.insert(CSRF_HEADER, value);
                    }
                    Err(_) => {
                        tracing::warn!("CSRF token is not a valid header value; omitting it");
                        self.inner.csrf_cache.invalidate();
                    }
                }
            }
        }

        Ok(headers)
    }

    /// Makes a GET request to the specified path.
    pub async fn get<Res>(&self, path: &str) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.call(path, RequestOptions::new(Method::GET)).await
    }

    /// Makes a HEAD request to the specified path.
    pub async fn head<Res>(&self, path: &str) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.call(path, RequestOptions::new(Method::HEAD)).await
    }

    /// Makes an OPTIONS request to the specified path.
    pub async fn options<Res>(&self, path: &str) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.call(path, RequestOptions::new(Method::OPTIONS)).await
    }

    /// Makes a POST request to the specified path with a JSON body.
    pub async fn post<Req, Res>(&self, path: &str, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let options = RequestOptions::new(Method::POST).with_json(body)?;
        self.call(path, options).await
    }

    /// Makes a PUT request to the specified path with a JSON body.
    pub async fn put<Req, Res>(&self, path: &str, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let options = RequestOptions::new(Method::PUT).with_json(body)?;
        self.call(path, options).await
    }

    /// Makes a PATCH request to the specified path with a JSON body.
    pub async fn patch<Req, Res>(&self, path: &str, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let options = RequestOptions::new(Method::PATCH).with_json(body)?;
        self.call(path, options).await
    }

    /// Makes a DELETE request to the specified path.
    pub async fn delete<Res>(&self, path: &str) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.call(path, RequestOptions::new(Method::DELETE)).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .field("retries", &self.inner.retries)
            .field("backoff", &self.inner.backoff)
            .finish_non_exhaustive()
    }
}

/// Network-layer failures are transient; builder and redirect-policy failures are not.
fn classify_transport_error(error: reqwest::Error, timeout: Duration) -> Attempt {
    if error.is_builder() || error.is_redirect() {
        Attempt::Terminal(Error::Transport(error))
    } else if error.is_timeout() {
        Attempt::Transient(TransientFailure::Timeout(timeout))
    } else {
        Attempt::Transient(TransientFailure::Connection(error))
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use shoplaunch_client::{Backoff, ClientBuilder};
/// use shoplaunch_client::navigate::FnNavigator;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), shoplaunch_client::Error> {
/// let client = ClientBuilder::from_env()?
///     .timeout(Duration::from_secs(10))
///     .retries(2)
///     .backoff(Backoff::Exponential {
///         initial_delay: Duration::from_millis(250),
///         max_delay: Duration::from_secs(2),
///         jitter: true,
///     })
///     .navigator(Arc::new(FnNavigator::new(|url| println!("go to {url}"))))
///     .default_header("User-Agent", "shoplaunch-web/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    backoff: Backoff,
    timeout: Duration,
    retries: usize,
    csrf_ttl: Duration,
    cookie_jar: Option<Arc<Jar>>,
    cookie_source: Option<Arc<dyn CookieSource>>,
    navigator: Option<Arc<dyn Navigator>>,
    refresh_path: String,
    login_redirect: String,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            backoff: Backoff::default(),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            csrf_ttl: DEFAULT_CSRF_TTL,
            cookie_jar: None,
            cookie_source: None,
            navigator: None,
            refresh_path: REFRESH_PATH.to_string(),
            login_redirect: LOGIN_REDIRECT.to_string(),
        }
    }

    /// Creates a builder whose base URL comes from `SHOPLAUNCH_API_URL`,
    /// falling back to `http://localhost:8000`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL is invalid.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        tracing::debug!(base_url = %base_url, "Resolved API base URL");
        Self::new().base_url(base_url.trim())
    }

    /// Sets the base URL for all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the delay policy between retries.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the default per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the default retry budget for transient failures.
    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Sets how long a CSRF token read from the cookie jar is reused.
    pub fn csrf_ttl(mut self, ttl: Duration) -> Self {
        self.csrf_ttl = ttl;
        self
    }

    /// Uses an existing cookie jar, shared with the transport.
    pub fn cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// Reads the CSRF cookie from `source` instead of the cookie jar.
    pub fn cookie_source(mut self, source: Arc<dyn CookieSource>) -> Self {
        self.cookie_source = Some(source);
        self
    }

    /// Sets the navigator used for the login redirect.
    ///
    /// Defaults to [`NoopNavigator`], which only logs.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Overrides the session refresh endpoint.
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Overrides where to redirect when the session ends.
    pub fn login_redirect(mut self, url: impl Into<String>) -> Self {
        self.login_redirect = url.into();
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided or if the transport cannot
    /// be constructed.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Configuration("Base URL is required".to_string()))?;

        let cookie_jar = self.cookie_jar.unwrap_or_default();

        let http_client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookie_jar))
            .build()
            .map_err(|e| {
                Error::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        let cookie_source = self
            .cookie_source
            .unwrap_or_else(|| Arc::clone(&cookie_jar) as Arc<dyn CookieSource>);

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                default_headers: self.default_headers,
                backoff: self.backoff,
                timeout: self.timeout,
                retries: self.retries,
                cookie_jar,
                cookie_source,
                csrf_cache: CsrfTokenCache::new(self.csrf_ttl),
                refresh: Arc::new(RefreshCoordinator::new()),
                navigator: self.navigator.unwrap_or_else(|| Arc::new(NoopNavigator)),
                refresh_path: self.refresh_path,
                login_redirect: self.login_redirect,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
