//! Single-flight coordination of session refreshes.
//!
//! Every request that sees a 401 needs the session refreshed, but the server
//! should only be asked once no matter how many requests fail together. The
//! coordinator keeps at most one refresh in flight; callers arriving while it is
//! outstanding await the same shared future, and the slot is emptied the moment
//! that future settles so the next 401 starts a fresh refresh.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

/// Result of a session refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The server accepted the refresh.
    Refreshed,
    /// The server rejected the refresh or could not be reached.
    Failed,
}

type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Holds the refresh currently in flight, if any.
#[derive(Default)]
pub struct RefreshCoordinator {
    in_flight: Mutex<Option<InFlight>>,
}

impl RefreshCoordinator {
    /// Creates a coordinator with no refresh in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Awaits the in-flight refresh, or starts one with `refresh` if none is running.
    ///
    /// `refresh` is only invoked when this call starts the refresh. The refresh
    /// is spawned onto the tokio runtime, so cancelling a caller never leaves
    /// it half-finished in the slot.
    pub async fn run<F, Fut>(self: &Arc<Self>, refresh: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome> + Send + 'static,
    {
        let shared = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(in_flight) => {
                    tracing::debug!("Joining session refresh already in flight");
                    in_flight.clone()
                }
                None => {
                    let coordinator = Arc::downgrade(self);
                    let refresh = refresh();

                    // Runs on its own task so it settles and releases the slot
                    // even if every waiter is dropped.
                    let task = tokio::spawn(async move {
                        let outcome = refresh.await;
                        if let Some(coordinator) = coordinator.upgrade() {
                            coordinator.release();
                        }
                        outcome
                    });

                    let shared = async move {
                        task.await.unwrap_or_else(|e| {
                            tracing::error!(error = %e, "Session refresh task failed");
                            RefreshOutcome::Failed
                        })
                    }
                    .boxed()
                    .shared();
                    *slot = Some(shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    /// Returns `true` while a refresh is outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn release(&self) {
        *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}
