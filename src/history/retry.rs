//! Bounded exponential backoff for transient failures.

use std::fmt;
use std::time::Duration;

use crate::observability::{STORE_EXHAUSTED, STORE_RETRIES, STORE_RETRY_BACKOFF};

/// Delay before the first retry.
pub const BASE_DELAY: Duration = Duration::from_millis(100);

/// Attempts made before giving up, counting the first.
pub const MAX_ATTEMPTS: u32 = 5;

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay after the first failed attempt.  Doubles after every further one.
    pub base_delay: Duration,
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Creates a policy.  At least one attempt is always made.
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts: max_attempts.max(1),
        }
    }

    /// The sleep after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(BASE_DELAY, MAX_ATTEMPTS)
    }
}

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The error was not transient; no retry was attempted.
    Permanent(E),
    /// Every attempt failed transiently.
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// The error from the final attempt.
        last: E,
    },
}

impl<E> RetryError<E> {
    /// The underlying error.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Permanent(err) => err,
            RetryError::Exhausted { last, .. } => last,
        }
    }

    /// Attempts made before giving up, when exhausted.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            RetryError::Permanent(_) => None,
            RetryError::Exhausted { attempts, .. } => Some(*attempts),
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Permanent(err) => write!(f, "{err}"),
            RetryError::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts: {last}")
            }
        }
    }
}

/// Runs an operation until it succeeds, fails permanently, or runs out of
/// attempts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Retrier {
    policy: RetryPolicy,
}

impl Retrier {
    /// Creates a retrier with the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy in use.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs `action`, sleeping between transient failures.
    ///
    /// `is_transient` decides which errors are worth another attempt.
    /// Sleeping yields to the runtime; nothing else about the caller's
    /// state changes between attempts.
    pub async fn run<T, E, P, F>(
        &self,
        operation: &str,
        is_transient: P,
        mut action: F,
    ) -> Result<T, RetryError<E>>
    where
        E: fmt::Display,
        P: Fn(&E) -> bool,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempt = 1;
        loop {
            let err = match action() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !is_transient(&err) {
                return Err(RetryError::Permanent(err));
            }
            if attempt >= self.policy.max_attempts {
                STORE_EXHAUSTED.click();
                tracing::warn!(operation, attempts = attempt, error = %err, "retries exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }
            let delay = self.policy.delay_after(attempt);
            STORE_RETRIES.click();
            STORE_RETRY_BACKOFF.add(delay.as_secs_f64());
            tracing::debug!(operation, attempt, ?delay, error = %err, "transient failure; backing off");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
