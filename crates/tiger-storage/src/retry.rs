//! Retry policy implementation with exponential backoff

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::Result;

/// Exponential backoff for entry reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum retry attempts after the first failure
    pub max_attempts: u32,

    /// Initial backoff duration
    pub initial_backoff: Duration,

    /// Maximum backoff duration
    pub max_backoff: Duration,

    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy that fails on the first error
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Create retry policy from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: std::env::var("TIGER_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts),
            initial_backoff: std::env::var("TIGER_RETRY_BACKOFF_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(defaults.initial_backoff, Duration::from_millis),
            ..defaults
        }
    }

    /// Set the number of retries
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the initial backoff
    #[must_use]
    pub const fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(
            (self.initial_backoff.as_secs_f64() * factor).min(self.max_backoff.as_secs_f64()),
        )
    }

    /// Execute `f` with retry logic
    ///
    /// `f` receives the attempt number, 0 for the first call.
    pub async fn execute<F, Fut, T>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match f(attempt).await {
                Ok(result) => return Ok(result),
                Err(e) if !e.should_retry() || attempt >= self.max_attempts => {
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    tracing::warn!("Attempt {} failed: {}", attempt, e);
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
            }
        }
    }
}
