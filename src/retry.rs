//! Bounded retry with linear backoff around a single external call
//!
//! Only failures the policy classifies as retryable are retried; every other
//! failure propagates on the spot. Each retryable failure is followed by its
//! backoff, the last one included, before the next attempt or the final
//! `RetriesExhausted`. Sleeping goes through [`Sleeper`] so the
//! policy can be exercised without real delays.

use crate::error::AdvisoryError;
use crate::Result;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Async sleep abstraction
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer; only the calling task is suspended.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub retryable: fn(&AdvisoryError) -> bool,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            retryable: AdvisoryError::is_transient,
        }
    }

    /// Linear backoff: attempt 1 waits one base delay, attempt 2 two, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_BASE_DELAY)
    }
}

/// Runs an operation under a [`RetryPolicy`].
#[derive(Clone)]
pub struct ResilientInvoker {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl ResilientInvoker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call `operation` until it succeeds, fails fatally, or the attempt
    /// budget runs out on retryable failures.
    pub async fn invoke<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if (self.policy.retryable)(&e) => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_secs = delay.as_secs_f64(),
                        error = %e,
                        "Inference provider busy, backing off"
                    );
                    self.sleeper.sleep(delay).await;
                }
                Err(e) => {
                    error!(attempt, error = %e, "Non-retryable failure");
                    return Err(e);
                }
            }
        }

        warn!(max_attempts, "Retry budget exhausted");
        Err(AdvisoryError::RetriesExhausted {
            attempts: max_attempts,
        })
    }
}

impl Default for ResilientInvoker {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
