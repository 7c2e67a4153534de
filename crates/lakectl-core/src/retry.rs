//! Bounded exponential-backoff retry around remote calls.
//!
//! Every remote call in this crate funnels through [`run_with_retry`]. The
//! executor classifies each failure, fails fast on non-retryable categories,
//! and otherwise sleeps `min(base * 2^(attempt-1), max)` before retrying.
//! Sleeps suspend only the calling task, so a backing-off dispatch never
//! stalls unrelated work on the runtime.

use crate::error::ClassifiedError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry tuning for one executor invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total invocation budget, including the first attempt. A value of 1
    /// means classify-only, no retry.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each retry.
    pub base_delay: Duration,
    /// Hard ceiling on any single backoff sleep.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Classify-only policy: surface the first failure immediately.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff before retrying after the given 1-based failed attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}

/// Run `op` under `policy`, classifying failures as they occur.
///
/// `op` sees no retry bookkeeping. Non-retryable failures return immediately
/// with no sleep. When a retryable failure consumes the last attempt, the
/// *last* classified error is surfaced with its exhausted marker set.
/// Reentrant: concurrent invocations keep independent attempt counters.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    op_name: &str,
    mut op: F,
) -> Result<T, ClassifiedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<ClassifiedError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(raw) => {
                let err: ClassifiedError = raw.into();
                if !err.is_retryable() {
                    debug!(
                        operation = op_name,
                        kind = %err.kind,
                        "non-retryable failure, surfacing immediately"
                    );
                    return Err(err);
                }
                if attempt >= max_attempts {
                    warn!(
                        operation = op_name,
                        attempts = max_attempts,
                        kind = %err.kind,
                        "retry budget exhausted"
                    );
                    return Err(err.exhausted());
                }
                let delay = policy.delay_for(attempt);
                warn!(
                    operation = op_name,
                    attempt,
                    remaining = max_attempts - attempt,
                    delay_ms = delay.as_millis() as u64,
                    kind = %err.kind,
                    "retryable failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
