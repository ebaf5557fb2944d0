//! Navigation performed when a session ends.
//!
//! The client redirects to the login page exactly once per failed session. The
//! redirect goes through a [`Navigator`] so embedding applications decide what
//! "navigate" means and tests can observe it without side effects.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Destination used when a session can no longer be refreshed.
pub const LOGIN_REDIRECT: &str = "/login?session_expired=true";

/// Performs a redirect to the given URL.
pub trait Navigator: Send + Sync {
    /// Navigates to `url`.
    fn redirect_to(&self, url: &str);
}

/// Logs the redirect and does nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect_to(&self, url: &str) {
        tracing::info!(url = %url, "Redirect requested (no navigator configured)");
    }
}

/// Remembers every redirect it is asked to perform.
///
/// # Examples
///
/// ```
/// use shoplaunch_client::navigate::{Navigator, RecordingNavigator};
///
/// let navigator = RecordingNavigator::new();
/// navigator.redirect_to("/login?session_expired=true");
/// assert_eq!(navigator.last_redirect().as_deref(), Some("/login?session_expired=true"));
/// assert_eq!(navigator.redirects().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    /// Creates a navigator with no recorded redirects.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded redirect, oldest first.
    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the most recent redirect.
    pub fn last_redirect(&self) -> Option<String> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to(&self, url: &str) {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
    }
}

/// Delegates redirects to a closure supplied by the embedding application.
///
/// # Examples
///
/// ```
/// use shoplaunch_client::navigate::{FnNavigator, Navigator};
///
/// let navigator = FnNavigator::new(|url| println!("navigating to {url}"));
/// navigator.redirect_to("/login");
/// ```
pub struct FnNavigator<F> {
    navigate: F,
}

impl<F> FnNavigator<F>
where
    F: Fn(&str) + Send + Sync,
{
    /// Wraps `navigate`.
    pub fn new(navigate: F) -> Self {
        Self { navigate }
    }
}

impl<F> Navigator for FnNavigator<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect_to(&self, url: &str) {
        (self.navigate)(url);
    }
}

impl<F> fmt::Debug for FnNavigator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnNavigator").finish_non_exhaustive()
    }
}
