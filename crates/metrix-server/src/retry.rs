//! Bounded retry with linear backoff for transient backend failures.
//!
//! The operation runs once. Only errors the caller-supplied classifier marks as
//! transient are retried; anything else is returned immediately. Between
//! attempts the delay starts at `initial_delay` and grows by `delay_increment`
//! after every failed retry.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::RetryConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failure. 0 disables retrying.
    pub retry_count: u32,
    pub initial_delay: Duration,
    pub delay_increment: Duration,
}

impl RetryPolicy {
    pub fn new(retry_count: u32, initial_delay: Duration, delay_increment: Duration) -> Self {
        Self {
            retry_count,
            initial_delay,
            delay_increment,
        }
    }

    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Delay slept before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.initial_delay + self.delay_increment.saturating_mul(retry.saturating_sub(1))
    }

    /// Run `op`, retrying while it fails with an error `is_transient` accepts.
    ///
    /// Returns the first success, the first permanent error, or the last
    /// transient error once `retry_count` retries are spent.
    pub async fn run<T, E, F, Fut, C>(&self, is_transient: C, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut retry = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if retry < self.retry_count && is_transient(&e) => {
                    retry += 1;
                    let delay = self.delay_for(retry);
                    warn!(
                        retry,
                        max_retries = self.retry_count,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient backend failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self::new(
            cfg.count,
            Duration::from_millis(cfg.initial_delay_ms),
            Duration::from_millis(cfg.delay_increment_ms),
        )
    }
}
