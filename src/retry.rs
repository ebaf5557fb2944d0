//! Backoff between retries of transient failures.
//!
//! Only network failures and timeouts are retried; how many times is decided per
//! request by the retry budget, and how long to wait in between is decided here.

use rand::Rng;
use std::time::Duration;

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRIES: usize = 3;

/// Default delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Defines how long to wait before retrying a transient failure.
///
/// # Examples
///
/// ```
/// use shoplaunch_client::Backoff;
/// use std::time::Duration;
///
/// // Fixed: 1s, 1s, 1s...
/// let fixed = Backoff::Fixed(Duration::from_secs(1));
///
/// // Exponential: 100ms, 200ms, 400ms... capped at 5s
/// let exponential = Backoff::Exponential {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(5),
///     jitter: false,
/// };
/// assert_eq!(exponential.delay_for_attempt(3), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone)]
pub enum Backoff {
    /// Wait the same delay before every retry.
    Fixed(Duration),

    /// Wait `initial_delay * 2^(attempt - 1)`, capped at `max_delay`.
    ///
    /// Optional jitter scales each delay by a random factor in `[0.5, 1.0]`.
    Exponential {
        /// The delay before the first retry.
        initial_delay: Duration,
        /// The maximum delay between retries.
        max_delay: Duration,
        /// Whether to add random jitter to delays.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Fixed(DEFAULT_RETRY_DELAY)
    }
}

impl Backoff {
    /// Returns the delay to wait after the given failed attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        match self {
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential {
                initial_delay,
                max_delay,
                jitter,
            } => {
                let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1) as u32);
                let delay = initial_delay.saturating_mul(multiplier).min(*max_delay);

                if *jitter {
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    delay.mul_f64(jitter_factor)
                } else {
                    delay
                }
            }
        }
    }
}
