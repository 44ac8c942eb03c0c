//! Bounded retry with backoff for throttled Kinesis calls
//!
//! Only the client adapter retries, and only for errors that report
//! themselves as retryable. The shard reader never goes through this module.

mod backoff;
mod error;

pub use backoff::{Backoff, ExponentialBackoff, ExponentialBackoffBuilder, FixedBackoff};
pub use error::RetryError;

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt (None for infinite)
    pub max_retries: Option<u32>,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: Some(3),
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// No retries at all; the first failure is returned as is
    pub fn disabled() -> Self {
        Self {
            max_retries: Some(0),
            ..Default::default()
        }
    }

    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::builder()
            .initial_delay(self.initial_backoff)
            .max_delay(self.max_backoff)
            .jitter_factor(self.jitter_factor)
            .build()
    }
}

/// Helper for retrying operations with backoff
pub struct RetryHandle<B: Backoff> {
    config: RetryConfig,
    backoff: B,
    attempts: u32,
}

impl<B: Backoff> RetryHandle<B> {
    pub fn new(config: RetryConfig, backoff: B) -> Self {
        Self {
            config,
            backoff,
            attempts: 0,
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the retry budget is spent.
    pub async fn retry<F, Fut, T, E>(&mut self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        loop {
            self.attempts += 1;
            trace!(attempt = self.attempts, "Executing operation");

            let e = match operation().await {
                Ok(value) => {
                    if self.attempts > 1 {
                        debug!(attempts = self.attempts, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !e.is_retryable() {
                return Err(RetryError::NonRetryable(e));
            }

            let retries_done = self.attempts - 1;
            if let Some(max) = self.config.max_retries {
                if retries_done >= max {
                    warn!(
                        attempts = self.attempts,
                        error = %e,
                        "Maximum retry attempts exceeded"
                    );
                    return Err(RetryError::MaxRetriesExceeded(self.attempts, e));
                }
            }

            let delay = self.backoff.next_delay(retries_done);
            warn!(
                attempt = self.attempts,
                delay_ms = ?delay.as_millis(),
                error = %e,
                "Operation failed, retrying after delay"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Number of attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
