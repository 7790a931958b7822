//! Transport retry policy applied to every backend call.

use async_trait::async_trait;
use azure_core::RetryPolicy as SdkRetryPolicy;
use std::sync::Arc;
use std::time::Duration;

/// Exponential backoff between retries of a failed backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Retries after the first attempt before the failure is final.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            max_retries: 5,
        }
    }
}

impl RetryPolicy {
    /// Returns the delay before retry number `retry` (zero-based), or `None`
    /// when the budget is exhausted.
    pub fn delay_for(&self, retry: u32) -> Option<Duration> {
        if retry >= self.max_retries {
            return None;
        }
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        Some(
            self.initial_delay
                .checked_mul(factor)
                .map_or(self.max_delay, |d| d.min(self.max_delay)),
        )
    }

    /// Converts the policy into the SDK's retry options.
    pub fn to_retry_options(&self) -> azure_core::RetryOptions {
        azure_core::RetryOptions::custom(Arc::new(*self))
    }
}

/// The SDK counts retries from 1 and asks for the delay before each one.
#[async_trait]
impl SdkRetryPolicy for RetryPolicy {
    fn is_expired(&self, _duration_since_start: Duration, retry_count: u32) -> bool {
        retry_count >= self.max_retries
    }

    fn sleep_duration(&self, retry_count: u32) -> Duration {
        self.delay_for(retry_count.saturating_sub(1))
            .unwrap_or(self.max_delay)
    }
}
