use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::duration::{deserialize_duration, serialize_duration};

use super::{RateError, RateResult};

fn default_attempts() -> u32 {
    3
}

fn default_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_attempt_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total tries, including the first. Zero is treated as one.
    pub attempts: u32,

    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub delay: Duration,

    /// Upper bound on a single attempt; a timed-out attempt counts as
    /// `SourceUnavailable`.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay: default_delay(),
            attempt_timeout: default_attempt_timeout(),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            delay,
            ..Default::default()
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }
}

/// Runs `op` until it succeeds or `policy.attempts` is exhausted, returning the
/// last error in the latter case.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> RateResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RateResult<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(RateError::unavailable(
                label,
                format!("attempt timed out after {:?}", policy.attempt_timeout),
            )),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                warn!(
                    source = label,
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "attempt failed, retrying"
                );
                attempt += 1;
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
