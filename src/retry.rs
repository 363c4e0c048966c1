//! Backoff strategies and the retryable status set.
//!
//! The retry budget itself lives in [`RequestOptions::max_retries`]; a
//! [`RetryStrategy`] only decides how long to wait between attempts.
//!
//! [`RequestOptions::max_retries`]: crate::RequestOptions::max_retries

use http::StatusCode;
use rand::Rng;
use std::time::Duration;

/// Statuses that are retried when the retry budget allows.
pub const RETRYABLE_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Returns `true` if a response with `status` may be retried.
pub fn is_retryable_status(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// How long to wait before each retry.
///
/// # Examples
///
/// ```
/// use telnyx::RetryStrategy;
/// use std::time::Duration;
///
/// // 100ms, 200ms, 400ms... capped at 5s
/// let exponential = RetryStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(5),
///     jitter: false,
/// };
/// assert_eq!(exponential.delay_for_attempt(3), Duration::from_millis(400));
///
/// let linear = RetryStrategy::Linear {
///     delay: Duration::from_millis(10),
/// };
/// assert_eq!(linear.delay_for_attempt(7), Duration::from_millis(10));
/// ```
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    /// Wait `initial_delay * 2^(attempt - 1)`, capped at `max_delay`.
    ///
    /// With `jitter`, the wait is scaled by a random factor in `[0.5, 1.0]`.
    ExponentialBackoff {
        /// The delay before the first retry.
        initial_delay: Duration,
        /// The maximum delay between retries.
        max_delay: Duration,
        /// Whether to randomize delays.
        jitter: bool,
    },

    /// Wait the same delay before every retry.
    Linear {
        /// The delay between attempts.
        delay: Duration,
    },

    /// Compute the delay from the retry number (1-indexed).
    Custom {
        /// Function returning the delay before the given retry.
        delay_fn: fn(retry: usize) -> Duration,
    },
}

impl Default for RetryStrategy {
    fn default() -> Self {
        RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: true,
        }
    }
}

impl RetryStrategy {
    /// Returns the delay before the given retry (1 = first retry).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        match self {
            RetryStrategy::ExponentialBackoff {
                initial_delay,
                max_delay,
                jitter,
            } => {
                let exponent = attempt.saturating_sub(1).min(31) as u32;
                let base_delay = initial_delay.saturating_mul(2u32.saturating_pow(exponent));
                let delay = base_delay.min(*max_delay);

                if *jitter {
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    delay.mul_f64(jitter_factor)
                } else {
                    delay
                }
            }
            RetryStrategy::Linear { delay } => *delay,
            RetryStrategy::Custom { delay_fn } => delay_fn(attempt),
        }
    }

    /// Returns the delay before the given retry, never shorter than `floor`.
    pub fn delay_with_floor(&self, attempt: usize, floor: Option<Duration>) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        floor.map_or(delay, |floor| delay.max(floor))
    }
}
