//! Bounded retry with exponential backoff for a single ElastiCache call.
//!
//! Only transient categories (throttling, timeouts, network, service outages) are
//! retried. Everything else is classified into an [`EcInfoError`] on the first failure.
//! Whole regions are never retried; this wraps one call path only.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use super::sdk_errors::categorize_error;
use crate::app::error::EcInfoError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for every following attempt
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps, for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Run `call` until it succeeds, fails permanently, or the attempts are used up.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    region: &str,
    mut call: F,
) -> Result<T, EcInfoError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match call().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("[{}] {} succeeded on attempt {}", region, operation, attempt);
                }
                return Ok(value);
            }
            Err(e) => {
                let category = categorize_error(&e, operation);

                if category.is_retryable() && attempt < max_attempts {
                    let delay = policy.delay_for_attempt(attempt);
                    warn!(
                        "[{}] {} {}, retrying in {:?} (attempt {}/{})",
                        region,
                        operation,
                        category.short_label(),
                        delay,
                        attempt,
                        max_attempts
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                debug!("[{}] {} failed: {:#}", region, operation, e);
                return Err(EcInfoError::from_category(category, operation, region, attempt));
            }
        }
    }
}
