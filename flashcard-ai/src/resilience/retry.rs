//! Retry with exponential backoff for transient failures
//!
//! The delay before retry `k` (1-indexed) is `min(initial * 2^(k-1), max)`,
//! with no jitter: 1s, 2s, 4s, then 8s for every later retry by default.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};
use log::warn;

use crate::error::{Result, ServiceError};
use crate::util::{sanitize_for_logging, truncate_string};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, first attempt included (must be at least 1)
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_interval: Duration,

    /// Cap on any single delay
    pub max_interval: Duration,

    /// Multiplier for backoff between retries
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_millis(1000),
            max_interval: Duration::from_millis(8000),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Default policy with a different attempt budget
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay scheduled before retry number `retry` (1-indexed), in closed form
    #[cfg(test)]
    fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.max(1) - 1).unwrap_or(i32::MAX);
        let secs = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        if secs.is_finite() && secs < self.max_interval.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max_interval
        }
    }

    /// Build the deterministic backoff sequence for one send
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: self.multiplier,
            randomization_factor: 0.0,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        }
    }
}

impl fmt::Display for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryConfig {{ max_attempts: {}, initial_interval: {:?}, max_interval: {:?}, multiplier: {} }}",
            self.max_attempts, self.initial_interval, self.max_interval, self.multiplier
        )
    }
}

/// Executor for retry operations with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor with the specified configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute a fallible operation with retries according to the configuration
    ///
    /// The closure receives the 1-indexed attempt number. Retryable errors
    /// trigger a backoff and a fresh attempt while budget remains; any other
    /// error propagates unchanged. Exhausting the budget yields
    /// `MaxRetriesExceeded` carrying the last error's message.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut backoff = self.config.backoff();
        let mut attempt = 1;

        loop {
            let err = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => err,
            };

            if attempt >= max_attempts {
                return Err(ServiceError::MaxRetriesExceeded {
                    attempts: attempt,
                    message: err.to_string(),
                });
            }

            let delay = backoff.next_backoff().unwrap_or(self.config.max_interval);
            warn!(
                "Request failed (attempt {}/{}), retrying in {:?}: {}",
                attempt,
                max_attempts,
                delay,
                truncate_string(&sanitize_for_logging(&err.to_string()), 200)
            );

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Get the current retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}
