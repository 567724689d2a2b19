//! Caller-side acquisition policies.
//!
//! The registry itself never retries and never times out: the right
//! attempt count, backoff and deadline depend on the caller. These helpers
//! wrap [`ResourceRegistry::acquire`] for callers that want one.

use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ResourceConfig;
use crate::errors::RegistryError;
use crate::registry::{ResourceRegistry, SharedHandle};
use crate::resource::ResourceFactory;

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Constant delay between attempts.
    Constant(Duration),
    /// Linear increase: delay * attempt.
    Linear(Duration),
    /// Exponential: delay * 2^(attempt - 1).
    Exponential(Duration),
}

impl BackoffStrategy {
    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Constant(d) => *d,
            Self::Linear(d) => d.saturating_mul(attempt),
            Self::Exponential(d) => {
                let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                d.saturating_mul(factor)
            }
        }
    }
}

/// Jitter applied on top of the backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterStrategy {
    /// No jitter.
    None,
    /// Full jitter: [0, delay].
    Full,
    /// Equal jitter: [delay/2, delay].
    Equal,
}

impl JitterStrategy {
    /// Applies jitter to a delay.
    #[must_use]
    pub fn apply(&self, delay: Duration) -> Duration {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let mut rng = rand::thread_rng();

        match self {
            Self::None => delay,
            Self::Full => Duration::from_millis(rng.gen_range(0..=millis)),
            Self::Equal => {
                let half = millis / 2;
                Duration::from_millis(half + rng.gen_range(0..=millis - half))
            }
        }
    }
}

/// How many times to attempt acquisition and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3, Duration::from_millis(200))
    }
}

impl RetryPolicy {
    /// Creates a retry policy.
    #[must_use]
    pub const fn new(max_attempts: u32, backoff: BackoffStrategy, jitter: JitterStrategy) -> Self {
        Self {
            max_attempts,
            backoff,
            jitter,
        }
    }

    /// Constant delay, no jitter.
    #[must_use]
    pub const fn constant(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, BackoffStrategy::Constant(delay), JitterStrategy::None)
    }

    /// Exponential backoff with full jitter.
    #[must_use]
    pub const fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self::new(
            max_attempts,
            BackoffStrategy::Exponential(base_delay),
            JitterStrategy::Full,
        )
    }

    /// Delay to wait after failed attempt number `attempt`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.jitter.apply(self.backoff.delay(attempt))
    }
}

/// Acquires with a deadline.
///
/// If the deadline passes, the in-flight creation is dropped, nothing is
/// stored, and [`RegistryError::Timeout`] is returned.
pub async fn acquire_with_timeout<F: ResourceFactory>(
    registry: &ResourceRegistry<F>,
    config: &ResourceConfig,
    timeout: Duration,
) -> Result<SharedHandle<F>, RegistryError> {
    match tokio::time::timeout(timeout, registry.acquire(config)).await {
        Ok(result) => result,
        Err(_) => {
            let after_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            warn!(after_ms, kind = %config.kind, "Resource acquisition timed out");
            Err(RegistryError::Timeout { after_ms })
        }
    }
}

/// Acquires, retrying retryable failures according to `policy`.
///
/// Configuration errors fail immediately. The last error is returned once
/// attempts are exhausted.
pub async fn acquire_with_retry<F: ResourceFactory>(
    registry: &ResourceRegistry<F>,
    config: &ResourceConfig,
    policy: &RetryPolicy,
) -> Result<SharedHandle<F>, RegistryError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match registry.acquire(config).await {
            Ok(handle) => return Ok(handle),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                debug!(attempt, max_attempts, delay_ms, error = %err, "Retrying acquisition");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
