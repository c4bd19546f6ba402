//! Exponential backoff around remote calls with cooperative cancellation.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::integration::ports::{TrackerError, VcsError};

/// Retry schedule for retryable remote failures.
///
/// An operation is attempted once and then retried up to `max_retries`
/// times. The delay before retry `n` (counting from zero) is
/// `base_delay * 2^n`, unless the failure advises a longer wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Returns the number of retries after the first attempt.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the delay before the first retry.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the total number of attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns the backoff before retry `retry` (zero-based).
    #[must_use]
    pub const fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(retry))
    }

    /// Runs `call` until it succeeds, fails permanently, exhausts the
    /// schedule or `cancel` fires.
    ///
    /// Cancellation is observed both while a call is in flight and while
    /// waiting out a backoff; an in-flight call is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::Cancelled`] on cancellation,
    /// [`RetryError::Exhausted`] when every attempt failed with a retryable
    /// error and [`RetryError::Failed`] on the first non-retryable error.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Retryable + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut retry = 0_u32;
        loop {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RetryError::Cancelled),
                result = call() => result,
            };
            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(RetryError::Failed(err)),
                Err(err) => err,
            };
            if retry >= self.max_retries {
                return Err(RetryError::Exhausted {
                    operation,
                    attempts: retry.saturating_add(1),
                    last: err,
                });
            }
            let delay = err
                .retry_after()
                .map_or_else(|| self.delay_for(retry), |advised| advised.max(self.delay_for(retry)));
            retry = retry.saturating_add(1);
            warn!(
                operation,
                attempt = retry,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "retrying after transient failure"
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RetryError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Failures that may be retried with backoff.
pub trait Retryable: std::error::Error {
    /// Returns `true` when another attempt may succeed.
    fn is_retryable(&self) -> bool;

    /// Returns a server-advised delay before the next attempt.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for TrackerError {
    fn is_retryable(&self) -> bool {
        Self::is_retryable(self)
    }

    fn retry_after(&self) -> Option<Duration> {
        Self::retry_after(self)
    }
}

impl Retryable for VcsError {
    fn is_retryable(&self) -> bool {
        Self::is_retryable(self)
    }
}

/// Outcome of a retried operation that did not succeed.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Cancellation was observed.
    #[error("cancelled")]
    Cancelled,

    /// Every attempt failed with a retryable error.
    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Name of the retried operation.
        operation: &'static str,
        /// Attempts made, including the first.
        attempts: u32,
        /// Error from the final attempt.
        #[source]
        last: E,
    },

    /// A non-retryable error ended the operation.
    #[error(transparent)]
    Failed(E),
}
