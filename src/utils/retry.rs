// src/utils/retry.rs

//! Retry policy shared by every remote call.
//!
//! A single attempt loop parameterized by an error classifier and a backoff
//! function per failure kind. Fetching, capturing and publishing all wrap
//! their one-shot API calls in the same primitive.

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result, RetryDisposition};
use crate::models::RetryConfig;

/// Delay growth between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Always `base`
    Fixed,
    /// `base × attempt`, attempt being 1-based
    Linear,
}

impl Backoff {
    pub fn delay(self, base: Duration, attempt: u32) -> Duration {
        match self {
            Backoff::Fixed => base,
            Backoff::Linear => base.saturating_mul(attempt),
        }
    }
}

/// Attempt budget plus backoff rules.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts per operation, first try included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub rate_limit_backoff: Backoff,
    pub transient_backoff: Backoff,
    /// Decides which failures are worth another attempt
    pub classify: fn(&AppError) -> RetryDisposition,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            rate_limit_backoff: Backoff::Linear,
            transient_backoff: Backoff::Fixed,
            classify: AppError::disposition,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay())
    }

    /// Replace the error classifier.
    pub fn with_classifier(mut self, classify: fn(&AppError) -> RetryDisposition) -> Self {
        self.classify = classify;
        self
    }

    /// Delay before the attempt following `attempt`, or `None` if the
    /// failure must not be retried.
    pub fn delay_after(&self, disposition: RetryDisposition, attempt: u32) -> Option<Duration> {
        match disposition {
            RetryDisposition::Fatal => None,
            RetryDisposition::RateLimited => {
                Some(self.rate_limit_backoff.delay(self.base_delay, attempt))
            }
            RetryDisposition::Transient => {
                Some(self.transient_backoff.delay(self.base_delay, attempt))
            }
        }
    }

    /// Run `op` until it succeeds, fails fatally, or the budget runs out.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let budget = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let Some(delay) = self.delay_after((self.classify)(&err), attempt) else {
                return Err(err);
            };

            if attempt >= budget {
                log::error!("{operation}: giving up after {attempt} attempts: {err}");
                return Err(AppError::exhausted(operation, attempt, err));
            }

            log::warn!(
                "{operation}: attempt {attempt}/{budget} failed ({err}), retrying in {:.1}s",
                delay.as_secs_f64()
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
