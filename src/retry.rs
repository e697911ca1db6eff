//! Bounded, jittered exponential backoff around a single remote call.
//!
//! The controller retries only [`ErrorKind::RateLimited`] failures.  Every
//! other failure is handed back after the attempt that produced it.  Rather
//! than re-raising, [`RetryController::invoke`] returns a [`RetryOutcome`]
//! that carries the final result together with the number of attempts made.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::{Error, ErrorKind, Result};
use crate::observability::{RETRY_ATTEMPTS, RETRY_BACKOFF, RETRY_RATE_LIMITED};

/// Default number of attempts, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default shortest wait between attempts.
pub const DEFAULT_MIN_WAIT_MS: u64 = 1_000;

/// Default longest wait between attempts.
pub const DEFAULT_MAX_WAIT_MS: u64 = 60_000;

/// How often and how patiently to retry.  Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    min_wait_ms: u64,
    max_wait_ms: u64,
}

impl RetryPolicy {
    /// Creates a validated policy.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `max_attempts` is zero or
    /// `min_wait_ms` exceeds `max_wait_ms`.
    pub fn new(max_attempts: u32, min_wait_ms: u64, max_wait_ms: u64) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::validation(
                "at least one attempt is required",
                Some("max_attempts".to_string()),
            ));
        }
        if min_wait_ms > max_wait_ms {
            return Err(Error::validation(
                format!("minimum wait {min_wait_ms}ms exceeds maximum wait {max_wait_ms}ms"),
                Some("min_wait_ms".to_string()),
            ));
        }
        Ok(Self {
            max_attempts,
            min_wait_ms,
            max_wait_ms,
        })
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            min_wait_ms: 0,
            max_wait_ms: 0,
        }
    }

    /// Total attempts, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Shortest wait between attempts, in milliseconds.
    pub fn min_wait_ms(&self) -> u64 {
        self.min_wait_ms
    }

    /// Longest wait between attempts, in milliseconds.
    pub fn max_wait_ms(&self) -> u64 {
        self.max_wait_ms
    }

    /// The inclusive range, in milliseconds, the wait after `attempt` is drawn from.
    ///
    /// The upper bound is `min(max_wait, min_wait * 2^(attempt-1))`, and
    /// never less than `min_wait`.
    pub fn backoff_bounds(&self, attempt: u32) -> (u64, u64) {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let upper = self
            .min_wait_ms
            .saturating_mul(factor)
            .min(self.max_wait_ms)
            .max(self.min_wait_ms);
        (self.min_wait_ms, upper)
    }

    /// Draws the wait that follows a failed `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let (lower, upper) = self.backoff_bounds(attempt);
        let millis = if lower == upper {
            lower
        } else {
            rand::thread_rng().gen_range(lower..=upper)
        };
        Duration::from_millis(millis)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_wait_ms: DEFAULT_MIN_WAIT_MS,
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
        }
    }
}

/// The result of a retried call and how many attempts it took.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// The value of the successful attempt, or the error of the last one.
    pub result: Result<T>,
    /// Attempts made, the first one included.
    pub attempts: u32,
}

impl<T> RetryOutcome<T> {
    /// Discards the attempt count.
    pub fn into_result(self) -> Result<T> {
        self.result
    }
}

/// Runs a remote call under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    /// Creates a controller for `policy`.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy in force.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invokes `call` until it succeeds, fails with something other than a
    /// rate limit, or runs out of attempts.
    ///
    /// This is the only place griseo sleeps.
    pub async fn invoke<T, F, Fut>(&self, mut call: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            RETRY_ATTEMPTS.click();
            let err = match call().await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(err) => err,
            };
            if err.kind() != ErrorKind::RateLimited {
                return RetryOutcome {
                    result: Err(err),
                    attempts: attempt,
                };
            }
            RETRY_RATE_LIMITED.click();
            if attempt >= self.policy.max_attempts {
                tracing::debug!(attempt, "rate limited; retries exhausted");
                return RetryOutcome {
                    result: Err(err),
                    attempts: attempt,
                };
            }
            let delay = self.policy.backoff(attempt);
            tracing::warn!(
                attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "rate limited; backing off"
            );
            RETRY_BACKOFF.add(delay.as_secs_f64());
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
