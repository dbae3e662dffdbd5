//! Retry with exponential backoff
//!
//! Shared retry wrapper used by both the local store and the remote client.
//! Errors classify themselves via [`Retryable`]: transient failures
//! (a failed transaction, a network error) are retried up to the policy
//! bound; permanent failures (quota exhausted, missing credentials, caller
//! bugs) short-circuit immediately, since retrying cannot change resource
//! exhaustion or the environment.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Classification hook for retry decisions
pub trait Retryable {
    /// Whether another attempt could plausibly succeed
    fn is_retryable(&self) -> bool;
}

/// Bounded exponential backoff policy.
///
/// Delay before attempt `n + 1` is `base_delay * factor^n`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (must be >= 1)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier applied per subsequent retry
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            factor: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries (single attempt)
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff delay after `attempt` failed attempts (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * self.factor.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Run `op` under `policy`, retrying transient failures with exponential
/// backoff.
///
/// There is no cancellation propagation: once dispatched, the operation runs
/// to its retry bound.
///
/// # Examples
///
/// ```rust,no_run
/// # use cardbox_core::retry::{with_retry, RetryPolicy, Retryable};
/// # #[derive(Debug, thiserror::Error)]
/// # #[error("boom")]
/// # struct Flaky;
/// # impl Retryable for Flaky {
/// #     fn is_retryable(&self) -> bool { true }
/// # }
/// # async fn example() -> Result<(), Flaky> {
/// let policy = RetryPolicy::default();
/// let value = with_retry(&policy, "load", || async { Ok::<_, Flaky>(42) }).await?;
/// assert_eq!(value, 42);
/// # Ok(())
/// # }
/// ```
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    E: Retryable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => {
                tracing::debug!("{} failed permanently (no retry): {}", label, err);
                return Err(err);
            }
            Err(err) if attempt >= policy.max_attempts => {
                tracing::warn!(
                    "{} failed after {} attempts, giving up: {}",
                    label,
                    attempt,
                    err
                );
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_after(attempt);
                tracing::debug!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    label,
                    attempt,
                    policy.max_attempts,
                    delay,
                    err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
