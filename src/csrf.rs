//! Anti-forgery token lookup with a short-lived cache.
//!
//! The server sets a `csrf_token` cookie and expects its value echoed in the
//! `X-CSRF-Token` header on state-changing requests. Parsing the cookie store on
//! every request is avoided by caching the decoded value for a fixed TTL; the
//! cache is checked at read time and is only ever emptied by [`CsrfTokenCache::invalidate`].

use reqwest::cookie::{CookieStore, Jar};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use url::Url;

/// Name of the cookie carrying the anti-forgery token.
pub const CSRF_COOKIE_NAME: &str = "csrf_token";

/// Default lifetime of a cached token.
pub const DEFAULT_CSRF_TTL: Duration = Duration::from_millis(180_000);

/// Read access to the cookies that would be sent to a URL.
///
/// Implemented for [`reqwest::cookie::Jar`], which is also the jar the client
/// hands to its transport, so cookies set by the server are visible here.
pub trait CookieSource: Send + Sync {
    /// Returns the `Cookie` header value (`name=value; name2=value2`) for `url`.
    fn cookie_header(&self, url: &Url) -> Option<String>;
}

impl CookieSource for Jar {
    fn cookie_header(&self, url: &Url) -> Option<String> {
        self.cookies(url)?.to_str().ok().map(str::to_owned)
    }
}

/// Caches the decoded anti-forgery token for a fixed TTL.
///
/// # Examples
///
/// ```
/// use shoplaunch_client::csrf::{CookieSource, CsrfTokenCache};
/// use std::time::Duration;
/// use url::Url;
///
/// struct Cookies(&'static str);
///
/// impl CookieSource for Cookies {
///     fn cookie_header(&self, _url: &Url) -> Option<String> {
///         Some(self.0.to_string())
///     }
/// }
///
/// let url = Url::parse("http://localhost:8000/").unwrap();
/// let cache = CsrfTokenCache::new(Duration::from_secs(180));
///
/// let token = cache.get(&Cookies("session=abc; csrf_token=my%20token"), &url);
/// assert_eq!(token.as_deref(), Some("my token"));
///
/// // Served from the cache even though the cookie is gone.
/// let token = cache.get(&Cookies(""), &url);
/// assert_eq!(token.as_deref(), Some("my token"));
/// ```
#[derive(Debug)]
pub struct CsrfTokenCache {
    ttl: Duration,
    entry: Mutex<Option<CachedToken>>,
}

#[derive(Debug)]
struct CachedToken {
    token: String,
    captured_at: Instant,
}

impl CsrfTokenCache {
    /// Creates an empty cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Returns the cached token, re-reading `source` when the cache is empty or stale.
    pub fn get(&self, source: &dyn CookieSource, url: &Url) -> Option<String> {
        let mut entry = self.entry.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = entry.as_ref() {
            if cached.captured_at.elapsed() < self.ttl {
                return Some(cached.token.clone());
            }
        }

        let token = source
            .cookie_header(url)
            .as_deref()
            .and_then(parse_csrf_cookie)?;

        tracing::debug!(ttl_ms = self.ttl.as_millis(), "Cached CSRF token from cookie store");

        *entry = Some(CachedToken {
            token: token.clone(),
            captured_at: Instant::now(),
        });
        Some(token)
    }

    /// Drops the cached token so the next read re-parses the cookie store.
    pub fn invalidate(&self) {
        *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns the configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for CsrfTokenCache {
    fn default() -> Self {
        Self::new(DEFAULT_CSRF_TTL)
    }
}

/// Extracts and percent-decodes the `csrf_token` value from a `Cookie` header.
///
/// Empty values and values that do not decode to UTF-8 are treated as absent.
pub fn parse_csrf_cookie(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|cookie| cookie.trim().split_once('='))
        .filter(|(name, _)| *name == CSRF_COOKIE_NAME)
        .find_map(|(_, value)| match urlencoding::decode(value) {
            Ok(decoded) if !decoded.is_empty() => Some(decoded.into_owned()),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring CSRF cookie that is not valid UTF-8");
                None
            }
        })
}
