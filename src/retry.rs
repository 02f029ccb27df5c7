//! Bounded retries with exponential backoff for transient network failures.

use log::warn;
use reqwest::StatusCode;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// How often and how patiently a failed request is repeated.
///
/// Only failures classified as transient (connection problems, timeouts, HTTP 5xx
/// and 429) are retried. The delay starts at `initial_delay` and doubles after
/// every attempt, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Errors that know whether repeating the operation may help.
pub(crate) trait Retryable: Sized + fmt::Display {
    fn is_transient(&self) -> bool;

    /// Wraps the last error once all attempts are used up.
    fn exhausted(self, attempts: u32) -> Self;
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (starting at 1).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `operation` until it succeeds, fails permanently, or the retries run out.
    pub(crate) async fn run<T, E, F, Fut>(&self, what: &str, mut operation: F) -> Result<T, E>
    where
        E: Retryable,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut retry = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && retry < self.max_retries => {
                    retry += 1;
                    let delay = self.delay_for(retry);
                    warn!(
                        "{} failed ({}), retry {}/{} in {:?}",
                        what, e, retry, self.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() && retry > 0 => return Err(e.exhausted(retry + 1)),
                Err(e) => return Err(e),
            }
        }
    }
}

/// Connection failures, timeouts and interrupted bodies are worth another attempt.
pub(crate) fn is_transient_request_error(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
}

/// Server side trouble and rate limiting are transient, every other 4xx is final.
pub(crate) fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
