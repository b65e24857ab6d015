//! Linear backoff retry for single directory calls.
//!
//! The delay before attempt `n + 1` is `n × base_delay`, so three attempts
//! with a 30 second base wait 30s then 60s. Nothing sleeps after the last
//! attempt. Only [`DirectoryError::is_transient`] errors are retried.

use crate::error::{DirectoryError, DirectoryResult};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first (0 is treated as 1).
    pub max_attempts: u32,
    /// Delay unit, multiplied by the attempt number.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after the given (1-based) failed attempt.
    ///
    /// A server `Retry-After` hint wins when it is longer than the linear
    /// delay.
    #[must_use]
    pub fn delay_after(&self, attempt: u32, error: &DirectoryError) -> Duration {
        let linear = self.base_delay.saturating_mul(attempt);
        match error.retry_after_secs() {
            Some(secs) => linear.max(Duration::from_secs(secs)),
            None => linear,
        }
    }

    /// Execute an async operation with retry.
    ///
    /// Non-transient errors return immediately and unwrapped. When every
    /// attempt fails with a transient error the last one is returned inside
    /// [`DirectoryError::RetriesExhausted`].
    pub async fn execute<F, Fut, T>(&self, operation: &str, mut f: F) -> DirectoryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DirectoryResult<T>>,
    {
        let max_attempts = self.attempts();
        let mut attempt: u32 = 1;
        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Operation succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) if !error.is_transient() => return Err(error),
                Err(error) if attempt >= max_attempts => {
                    warn!(
                        operation,
                        attempts = attempt,
                        error = %error,
                        "Retries exhausted"
                    );
                    return Err(DirectoryError::RetriesExhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        source: Box::new(error),
                    });
                }
                Err(error) => {
                    let delay = self.delay_after(attempt, &error);
                    debug!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
