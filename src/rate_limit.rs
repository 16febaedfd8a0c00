//! Per-family token buckets.
//!
//! Each [`ServiceFamily`] owns one bucket behind its own mutex, so callers of
//! different families never contend. Buckets refill continuously at
//! `capacity / window` tokens per second and can be frozen by a
//! server-asserted `Retry-After`.

use crate::error::{ApiError, ErrorKind};
use crate::family::ServiceFamily;
use log::{debug, info};
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};

// Waits shorter than this are rounded up so a waiter never spins on float residue.
const MIN_WAIT: Duration = Duration::from_millis(1);
/// Longest freeze a server can impose.
const MAX_FREEZE: Duration = Duration::from_secs(86_400);
const EPSILON: f64 = 1e-9;

/// `capacity` requests per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub capacity: u32,
    pub window: Duration,
}

impl Quota {
    pub const fn new(capacity: u32, window: Duration) -> Self {
        Self { capacity, window }
    }

    pub fn refill_per_second(&self) -> f64 {
        self.capacity as f64 / self.window.as_secs_f64()
    }

    /// Parses `N/unit` where unit is `s`, `min`, `hour`, `day` or a number of seconds.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (cap, unit) = s
            .split_once('/')
            .ok_or_else(|| format!("expected N/unit, got {:?}", s))?;
        let capacity = cap
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("bad capacity {:?}: {}", cap, e))?;
        if capacity == 0 {
            return Err("capacity must be positive".into());
        }
        let secs = match unit.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "second" => 1,
            "m" | "min" | "minute" => 60,
            "h" | "hour" => 3_600,
            "d" | "day" => 86_400,
            other => other
                .trim_end_matches('s')
                .parse::<u64>()
                .map_err(|_| format!("bad window {:?}", unit))?,
        };
        if secs == 0 {
            return Err("window must be positive".into());
        }
        Ok(Self::new(capacity, Duration::from_secs(secs)))
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.window.as_secs() {
            60 => write!(f, "{}/min", self.capacity),
            3_600 => write!(f, "{}/hour", self.capacity),
            86_400 => write!(f, "{}/day", self.capacity),
            secs => write!(f, "{}/{}s", self.capacity, secs),
        }
    }
}

/// Token bucket state. Pure with respect to time: every method takes `now`.
#[derive(Debug)]
pub struct Bucket {
    capacity: f64,
    refill_per_second: f64,
    tokens: f64,
    last_refill: Instant,
    frozen_until: Option<Instant>,
}

impl Bucket {
    /// A fresh bucket holds a single permit; the rest accrues at the refill rate.
    pub fn new(quota: Quota, now: Instant) -> Self {
        let capacity = quota.capacity as f64;
        Self {
            capacity,
            refill_per_second: quota.refill_per_second(),
            tokens: capacity.min(1.0),
            last_refill: now,
            frozen_until: None,
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn frozen_until(&self) -> Option<Instant> {
        self.frozen_until
    }

    pub fn refill(&mut self, now: Instant) {
        if let Some(until) = self.frozen_until {
            if now < until {
                self.tokens = 0.0;
                self.last_refill = now;
                return;
            }
            // The server allows the next call at `until`.
            self.frozen_until = None;
            self.tokens = self.capacity.min(1.0);
            self.last_refill = until;
        }
        if now > self.last_refill {
            let elapsed = now.duration_since(self.last_refill).as_secs_f64();
            self.tokens = (self.tokens + elapsed * self.refill_per_second).min(self.capacity);
            self.last_refill = now;
        }
    }

    /// Takes one permit, or returns how long until one is available.
    pub fn try_take(&mut self, now: Instant) -> Result<(), Duration> {
        self.refill(now);
        if let Some(until) = self.frozen_until {
            return Err(until.duration_since(now).max(MIN_WAIT));
        }
        if self.tokens + EPSILON >= 1.0 {
            self.tokens = (self.tokens - 1.0).max(0.0);
            return Ok(());
        }
        let secs = (1.0 - self.tokens) / self.refill_per_second;
        Err(Duration::from_secs_f64(secs).max(MIN_WAIT))
    }

    /// Zeroes the bucket until `until`. An earlier freeze never shortens a later one.
    pub fn freeze_until(&mut self, until: Instant, now: Instant) {
        self.refill(now);
        if until <= now {
            return;
        }
        self.frozen_until = Some(self.frozen_until.map_or(until, |f| f.max(until)));
        self.tokens = 0.0;
        self.last_refill = now;
    }
}

/// Proof that a permit was granted. Dropping it does not return the permit.
#[derive(Debug)]
#[must_use]
pub struct Token {
    family: ServiceFamily,
    granted_at: Instant,
}

impl Token {
    pub fn family(&self) -> ServiceFamily {
        self.family
    }

    pub fn granted_at(&self) -> Instant {
        self.granted_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("gave up on a {family} rate-limit token after {waited:?}; next permit in {needed:?}")]
pub struct AcquireTimeout {
    pub family: ServiceFamily,
    pub waited: Duration,
    pub needed: Duration,
}

impl From<AcquireTimeout> for ApiError {
    fn from(e: AcquireTimeout) -> Self {
        let secs = e.needed.as_secs_f64().ceil().max(1.0) as u64;
        ApiError::new(ErrorKind::RateLimit, e.to_string()).with_retry_after(secs)
    }
}

/// One bucket per service family, constructed explicitly and shared by `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    quotas: [Quota; 6],
    buckets: [Mutex<Bucket>; 6],
}

impl RateLimiter {
    /// Families absent from `quotas` get their default quota.
    pub fn new<I>(quotas: I) -> Self
    where
        I: IntoIterator<Item = (ServiceFamily, Quota)>,
    {
        let mut table = ServiceFamily::ALL.map(ServiceFamily::default_quota);
        for (family, quota) in quotas {
            table[family.index()] = quota;
        }
        let now = Instant::now();
        Self {
            quotas: table,
            buckets: table.map(|q| Mutex::new(Bucket::new(q, now))),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(std::iter::empty())
    }

    pub fn quota(&self, family: ServiceFamily) -> Quota {
        self.quotas[family.index()]
    }

    pub fn available(&self, family: ServiceFamily) -> f64 {
        let mut bucket = self.bucket(family);
        bucket.refill(Instant::now());
        bucket.tokens()
    }

    /// Non-blocking acquire; on refusal returns the wait until the next permit.
    pub fn try_acquire(&self, family: ServiceFamily) -> Result<Token, Duration> {
        let now = Instant::now();
        self.bucket(family).try_take(now)?;
        Ok(Token {
            family,
            granted_at: now,
        })
    }

    /// Waits for a permit. `None` waits indefinitely. A wait that would
    /// overrun `timeout` fails straight away without sleeping, and a
    /// cancelled or failed acquire never consumes a permit.
    pub async fn acquire(
        &self,
        family: ServiceFamily,
        timeout: Option<Duration>,
    ) -> Result<Token, AcquireTimeout> {
        let started = Instant::now();
        loop {
            let wait = match self.try_acquire(family) {
                Ok(token) => return Ok(token),
                Err(wait) => wait,
            };
            let waited = started.elapsed();
            if let Some(limit) = timeout {
                if waited + wait > limit {
                    return Err(AcquireTimeout {
                        family,
                        waited,
                        needed: wait,
                    });
                }
            }
            debug!("{} bucket empty; waiting {:?} for a permit", family, wait);
            sleep(wait).await;
        }
    }

    pub fn freeze_until(&self, family: ServiceFamily, until: Instant) {
        self.bucket(family).freeze_until(until, Instant::now());
    }

    pub fn freeze_for(&self, family: ServiceFamily, duration: Duration) {
        let duration = duration.min(MAX_FREEZE);
        info!("{} bucket frozen for {:?} by server", family, duration);
        let now = Instant::now();
        let until = now.checked_add(duration).unwrap_or(now);
        self.freeze_until(family, until);
    }

    fn bucket(&self, family: ServiceFamily) -> MutexGuard<'_, Bucket> {
        // Bucket updates cannot panic midway, so a poisoned lock still holds valid state.
        self.buckets[family.index()]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::with_defaults()
    }
}
