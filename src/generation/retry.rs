use crate::config::RetryConfig;
use crate::error::{HydeError, Result};
use std::future::Future;
use std::time::Duration;

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed,
    /// Delay multiplied by `factor` after each failure, capped at `max_delay`
    Exponential { factor: u32, max_delay: Duration },
}

/// Retry policy for backend calls.
///
/// `max_attempts = None` retries until success; every other value surfaces
/// `HydeError::RetriesExhausted` after that many failed attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::bounded(10, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// Keep trying forever with a fixed delay
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            max_attempts: None,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Give up after `max_attempts` failures (at least one attempt is always made)
    pub fn bounded(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            delay,
            backoff: Backoff::Fixed,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Build from the `[generation.retry]` config section (0 attempts = unbounded)
    pub fn from_config(config: &RetryConfig) -> Self {
        let delay = Duration::from_millis(config.delay_ms);
        let policy = if config.max_attempts == 0 {
            Self::unbounded(delay)
        } else {
            Self::bounded(config.max_attempts, delay)
        };
        match config.backoff.as_str() {
            "exponential" => policy.with_backoff(Backoff::Exponential {
                factor: 2,
                max_delay: Duration::from_millis(config.max_delay_ms),
            }),
            _ => policy,
        }
    }

    /// Delay to wait after the `failures`-th failed attempt (1-based)
    pub fn delay_for(&self, failures: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { factor, max_delay } => {
                let exp = failures.saturating_sub(1).min(31);
                let multiplier = factor.max(1).saturating_pow(exp);
                self.delay.saturating_mul(multiplier).min(max_delay)
            }
        }
    }

    /// Run `op` until it succeeds or the policy gives up.
    ///
    /// Every error is treated as retryable; `what` names the call in log lines.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut failures: u32 = 0;
        loop {
            match op().await {
                Ok(value) => {
                    if failures > 0 {
                        log::debug!("{} succeeded after {} retries", what, failures);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    if let Some(max) = self.max_attempts {
                        if failures >= max {
                            log::error!("{} failed {} times, giving up: {}", what, failures, e);
                            return Err(HydeError::RetriesExhausted {
                                attempts: failures,
                                last_error: e.to_string(),
                            });
                        }
                    }
                    let delay = self.delay_for(failures);
                    match self.max_attempts {
                        Some(max) => log::warn!(
                            "{} failed (attempt {}/{}), retrying in {:?}: {}",
                            what,
                            failures,
                            max,
                            delay,
                            e
                        ),
                        None => log::warn!(
                            "{} failed (attempt {}), retrying in {:?}: {}",
                            what,
                            failures,
                            delay,
                            e
                        ),
                    }
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
