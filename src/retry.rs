//! Retry loop around token acquisition and a single call.

use crate::auth::CredentialProvider;
use crate::config::Config;
use crate::error::{ApiError, ErrorKind};
use crate::http::{RawResponse, RequestExecutor, RequestSpec};
use crate::rate_limit::RateLimiter;
use log::{debug, warn};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

/// One attempt within a call. Lives only as long as the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub attempt: u32,
    /// Time spent waiting for a permit plus the backoff before this attempt.
    pub waited: Duration,
    pub outcome: Result<u16, ErrorKind>,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Randomize each backoff by ±50%.
    pub jitter: bool,
    /// Longest wait for a permit per attempt; `None` waits indefinitely.
    pub acquire_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: true,
            acquire_timeout: None,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: Duration::from_millis(cfg.backoff_base_ms),
            max_delay: Duration::from_millis(cfg.backoff_max_ms),
            jitter: true,
            acquire_timeout: cfg.acquire_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// `base * 2^attempt`, capped at `max_delay`, then jittered ±50%.
    /// `attempt` counts failed attempts so far, starting at 0.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        let capped = self.base_delay.saturating_mul(factor).min(self.max_delay);
        if self.jitter {
            capped.mul_f64(0.5 + fastrand::f64())
        } else {
            capped
        }
    }

    /// The server's `Retry-After` wins for rate-limit errors.
    pub fn delay_for(&self, err: &ApiError, attempt: u32) -> Duration {
        match (err.kind, err.retry_after()) {
            (ErrorKind::RateLimit, Some(wait)) => wait,
            _ => self.backoff(attempt),
        }
    }

    /// Runs `spec` to a terminal outcome: success, a non-retryable error, or
    /// the last error once attempts run out.
    pub async fn perform(
        &self,
        spec: &RequestSpec,
        credentials: &CredentialProvider,
        limiter: &RateLimiter,
        executor: &RequestExecutor,
    ) -> Result<RawResponse, ApiError> {
        let call_id = Uuid::new_v4();
        let mut history: Vec<AttemptRecord> = Vec::new();
        let mut pending_backoff = Duration::ZERO;
        // One header for the whole call, retries included.
        let header = credentials.resolve(spec.family)?;
        loop {
            let attempt = history.len() as u32 + 1;

            let wait_started = Instant::now();
            let token = limiter.acquire(spec.family, self.acquire_timeout).await;
            let waited = pending_backoff + wait_started.elapsed();
            if let Err(e) = token {
                warn!("{} {} [{}]: {}", spec.method, spec.path, call_id, e);
                return Err(e.into());
            }

            let err = match executor.execute(spec, &header).await {
                Ok(resp) => {
                    debug!(
                        "{} {} [{}]: {} after {} attempt(s)",
                        spec.method, spec.path, call_id, resp.status, attempt
                    );
                    return Ok(resp);
                }
                Err(e) => e,
            };
            history.push(AttemptRecord {
                attempt,
                waited,
                outcome: Err(err.kind),
            });

            if !err.is_retryable() || attempt >= self.max_attempts {
                if attempt > 1 {
                    let total: Duration = history.iter().map(|r| r.waited).sum();
                    warn!(
                        "{} {} [{}]: giving up after {} attempts ({:?} waiting): {}",
                        spec.method, spec.path, call_id, attempt, total, err
                    );
                }
                return Err(err);
            }

            let delay = self.delay_for(&err, attempt - 1);
            warn!(
                "{} {} [{}]: attempt {}/{} failed ({}), retrying in {:?}",
                spec.method, spec.path, call_id, attempt, self.max_attempts, err.kind, delay
            );
            sleep(delay).await;
            pending_backoff = delay;
        }
    }
}
