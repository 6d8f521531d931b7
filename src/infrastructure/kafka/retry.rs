//! Bounded exponential backoff for transient broker failures.

use std::future::Future;
use std::time::Duration;

use log::warn;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            initial_delay: Duration::from_millis(300),
            multiplier: 2,
        }
    }
}

/// Runs `operation` until it succeeds or `policy.retries` retries are spent,
/// sleeping `initial_delay * multiplier^n` between attempts.
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation: F,
    policy: &RetryPolicy,
    context: &str,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = policy.initial_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.retries => {
                warn!("{} failed after {} attempts: {}", context, attempt + 1, e);
                return Err(e);
            }
            Err(e) => {
                attempt += 1;
                warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    context,
                    attempt,
                    policy.retries + 1,
                    delay,
                    e
                );
                sleep(delay).await;
                delay *= policy.multiplier;
            }
        }
    }
}
