//! Bounded retry with exponential backoff for the Retry and AfterRetry phases.
//!
//! [`Request::send`] loops for as long as the Retry and AfterRetry phases keep
//! clearing the error, so the attempt limit lives here:
//!
//! - Retry: a retryable error is cleared while `retry_count < max_retries`
//! - AfterRetry: when the error was cleared, sleep for the backoff delay and
//!   increment `retry_count`
//!
//! # Example
//!
//! ```rust
//! use reqchain_runtime::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::builder()
//!     .max_retries(5)
//!     .initial_delay(Duration::from_millis(100))
//!     .max_delay(Duration::from_secs(10))
//!     .multiplier(2.0)
//!     .build();
//!
//! assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
//! ```

use crate::metrics::RetryMetrics;
use rand::Rng;
use reqchain_core::{Handlers, NamedHandler, Request};
use std::time::Duration;

/// Name of the Retry step installed by [`RetryPolicy::retry_handler`]
pub const RETRY_HANDLER: &str = "reqchain.Retry";
/// Name of the AfterRetry step installed by [`RetryPolicy::after_retry_handler`]
pub const AFTER_RETRY_HANDLER: &str = "reqchain.AfterRetry";

/// Retry policy configuration for exponential backoff.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `initial_delay`: 100ms
/// - `max_delay`: 30 seconds
/// - `multiplier`: 2.0 (delay doubles each retry)
/// - `jitter`: 0.0 (no randomization)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries (cap for exponential backoff)
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Fraction of each delay, in `0.0..=1.0`, that is randomly removed
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            max_retries: Some(3),
            initial_delay: Some(Duration::from_millis(100)),
            max_delay: Some(Duration::from_secs(30)),
            multiplier: Some(2.0),
            jitter: Some(0.0),
        }
    }

    /// Policy that never retries
    #[must_use]
    pub fn none() -> Self {
        Self::builder().max_retries(0).build()
    }

    /// Calculate delay for a given attempt number.
    ///
    /// Uses exponential backoff: delay = `initial_delay` * (multiplier ^ attempt)
    /// Capped at `max_delay`, before jitter.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = if attempt == 0 {
            self.initial_delay
        } else {
            let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
            let seconds = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
            if seconds.is_finite() && seconds < self.max_delay.as_secs_f64() {
                Duration::from_secs_f64(seconds.max(0.0))
            } else {
                self.max_delay
            }
        };
        let delay = delay.min(self.max_delay);

        if self.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let jitter = self.jitter.min(1.0);
        let factor = 1.0 - jitter * rand::thread_rng().gen_range(0.0..=1.0);
        delay.mul_f64(factor)
    }

    /// Retry step: clears retryable errors until the retry budget is spent.
    #[must_use]
    pub fn retry_handler(&self) -> NamedHandler {
        let max_retries = self.max_retries;
        NamedHandler::new(RETRY_HANDLER, move |request: &mut Request| {
            let Some(error) = &request.error else {
                return;
            };
            let attempt = request.retry_count;

            if !error.is_retryable() {
                tracing::debug!(
                    operation = %request.operation.name,
                    error = %error,
                    "Error is not retryable, failing immediately"
                );
                return;
            }

            if attempt >= max_retries {
                tracing::error!(
                    operation = %request.operation.name,
                    attempt,
                    error = %error,
                    "Request failed after max retries"
                );
                RetryMetrics::record_exhausted();
                return;
            }

            tracing::warn!(
                operation = %request.operation.name,
                attempt,
                error = %error,
                "Request failed, retrying..."
            );
            RetryMetrics::record_attempt();
            request.error = None;
        })
    }

    /// AfterRetry step: backs off and counts the retry when one was granted.
    #[must_use]
    pub fn after_retry_handler(&self) -> NamedHandler {
        let policy = self.clone();
        NamedHandler::new(AFTER_RETRY_HANDLER, move |request: &mut Request| {
            if request.error.is_some() {
                return;
            }
            let delay = policy.delay_for_attempt(request.retry_count);
            if !delay.is_zero() {
                tracing::debug!(delay_ms = delay.as_millis(), "Backing off before retry");
                std::thread::sleep(delay);
            }
            request.retry_count += 1;
        })
    }

    /// Install both steps at the end of the Retry and AfterRetry phases.
    pub fn install(&self, handlers: &mut Handlers) {
        handlers.retry.push_back_named(self.retry_handler());
        handlers.after_retry.push_back_named(self.after_retry_handler());
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_retries: Option<u32>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
}

impl RetryPolicyBuilder {
    /// Set maximum number of retries.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set initial delay before first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set maximum delay (cap for exponential backoff).
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set multiplier for exponential backoff.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Set the random fraction removed from each delay (clamped to `0.0..=1.0`).
    #[must_use]
    pub const fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Build the [`RetryPolicy`].
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(3),
            initial_delay: self.initial_delay.unwrap_or(Duration::from_millis(100)),
            max_delay: self.max_delay.unwrap_or(Duration::from_secs(30)),
            multiplier: self.multiplier.unwrap_or(2.0),
            jitter: self.jitter.unwrap_or(0.0).clamp(0.0, 1.0),
        }
    }
}
