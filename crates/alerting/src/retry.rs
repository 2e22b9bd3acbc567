//! Bounded-retry execution for channel deliveries.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ChannelError;

/// Fixed-delay retry configuration shared by all channels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts per delivery, including the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed delay between attempts, in milliseconds. No jitter: alert
    /// cadence is expected to be predictable.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

impl RetryPolicy {
    /// Delay between attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay)
    }
}

/// Scheduler seam so tests can observe delays without wall-clock waits.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Result of one channel delivery, after retries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    pub channel: String,
    pub success: bool,
    /// Attempts actually made, 1..=`max_retries`.
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Run `op` up to `policy.max_retries` times with a fixed delay in between.
///
/// Never returns an error: exhaustion is reported through the outcome so a
/// failing channel cannot take down the dispatch that owns it. Retries are
/// strictly sequential; the delay is a scheduled suspension, not a busy-wait.
pub async fn run_with_retry<F, Fut>(
    channel: &str,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut op: F,
) -> DeliveryOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), ChannelError>>,
{
    let max_attempts = policy.max_retries.max(1);
    let mut attempts = 0;
    let mut last_error = None;

    while attempts < max_attempts {
        attempts += 1;
        match op().await {
            Ok(()) => {
                debug!(channel, attempts, "delivery succeeded");
                return DeliveryOutcome {
                    channel: channel.to_string(),
                    success: true,
                    attempts,
                    last_error: None,
                };
            }
            Err(e) => {
                warn!(channel, attempt = attempts, error = %e, "delivery attempt failed");
                last_error = Some(e.to_string());
                if attempts < max_attempts {
                    sleeper.sleep(policy.delay()).await;
                }
            }
        }
    }

    DeliveryOutcome {
        channel: channel.to_string(),
        success: false,
        attempts,
        last_error,
    }
}
