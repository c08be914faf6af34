//! Per-domain rate gates.
//!
//! A [`RateLimit`] enforces a minimum interval between successive requests
//! to the domains it covers. A [`RateLimitRegistry`] holds all configured
//! limits, most specific first, and picks the one that applies to a host.
//!
//! Acquisition is a reservation: under a short lock the caller claims the
//! next free slot (`max(now, last_use + interval)`) and records it as the
//! new `last_use`, then sleeps until that slot outside the lock. Two
//! callers can never claim slots closer than `interval` apart, and a
//! sleeping caller never holds up workers using other limits.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::UrlStatusError;

/// A gate that can be passed at most `rate` times per second.
#[derive(Debug)]
pub struct RateLimit {
    /// Lowercased domain scope; `None` matches every domain
    domain: Option<String>,
    /// Requests per second as configured
    rate: f64,
    /// `1 / rate`, or zero for unlimited
    interval: Duration,
    /// Slot claimed by the most recent acquisition
    last_use: Mutex<Option<Instant>>,
}

impl RateLimit {
    /// Create a limit for `domain` (or every domain when `None`/empty).
    ///
    /// A rate of zero means unlimited. Negative or non-finite rates are
    /// rejected.
    pub fn new(domain: Option<&str>, rate: f64) -> Result<Self, UrlStatusError> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(UrlStatusError::config(format!(
                "Rate must be a finite, non-negative number, got {}",
                rate
            )));
        }

        let domain = domain
            .map(|d| d.trim().trim_start_matches('.').to_lowercase())
            .filter(|d| !d.is_empty());

        let interval = if rate > 0.0 {
            Duration::try_from_secs_f64(1.0 / rate).map_err(|_| {
                UrlStatusError::config(format!("Rate {} is too small to schedule", rate))
            })?
        } else {
            Duration::ZERO
        };

        Ok(Self {
            domain,
            rate,
            interval,
            last_use: Mutex::new(None),
        })
    }

    /// The domain this limit is scoped to, if any.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Configured requests per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Minimum spacing between two acquisitions.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether this limit applies to `domain`.
    ///
    /// A catch-all limit matches everything. A scoped limit matches the
    /// domain itself and any of its subdomains.
    pub fn matches(&self, domain: &str) -> bool {
        let Some(scope) = &self.domain else {
            return true;
        };

        let domain = domain.to_lowercase();
        domain == *scope
            || (domain.len() > scope.len()
                && domain.ends_with(scope.as_str())
                && domain.as_bytes()[domain.len() - scope.len() - 1] == b'.')
    }

    /// Wait until this limit may be used, then mark it used.
    ///
    /// Only the calling task is suspended. Never waits when the interval
    /// is zero.
    pub async fn acquire(&self) {
        if let Some(slot) = self.reserve() {
            let wait = slot.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                tracing::debug!(
                    domain = self.domain().unwrap_or("*"),
                    wait_ms = wait.as_millis() as u64,
                    "rate limit delaying request"
                );
            }
            tokio::time::sleep_until(slot).await;
        }
    }

    /// Claim the next free slot. Returns `None` for unlimited gates.
    fn reserve(&self) -> Option<Instant> {
        if self.interval.is_zero() {
            return None;
        }

        // The guarded value is a plain timestamp, a poisoned lock leaves
        // nothing half-written.
        let mut last_use = self
            .last_use
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        let slot = match *last_use {
            Some(previous) => (previous + self.interval).max(now),
            None => now,
        };
        *last_use = Some(slot);
        Some(slot)
    }
}

impl FromStr for RateLimit {
    type Err = UrlStatusError;

    /// Parse `rate` or `domain:rate`, splitting on the first `:`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (domain, rate_text) = match raw.split_once(':') {
            Some((domain, rate)) => (Some(domain), rate),
            None => (None, raw),
        };

        let rate = rate_text
            .trim()
            .parse::<f64>()
            .map_err(|_| UrlStatusError::invalid_rate(raw))?;

        RateLimit::new(domain, rate).map_err(|_| UrlStatusError::invalid_rate(raw))
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.domain {
            Some(domain) => write!(f, "{}:{}", domain, self.rate),
            None => write!(f, "{}", self.rate),
        }
    }
}

/// All configured rate limits, ordered most specific first.
#[derive(Debug, Default)]
pub struct RateLimitRegistry {
    limits: Vec<RateLimit>,
}

impl RateLimitRegistry {
    /// Build a registry, sorting limits by scope length (longest first).
    /// Catch-all limits sort last; ties keep their configured order.
    pub fn new(mut limits: Vec<RateLimit>) -> Self {
        limits.sort_by_key(|limit| std::cmp::Reverse(limit.domain().map_or(0, str::len)));
        Self { limits }
    }

    /// Parse every specification, failing on the first malformed one.
    pub fn from_specs<S: AsRef<str>>(specs: &[S]) -> Result<Self, UrlStatusError> {
        let limits = specs
            .iter()
            .map(|spec| spec.as_ref().parse::<RateLimit>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(limits))
    }

    /// The most specific limit that matches `domain`, if any.
    pub fn resolve(&self, domain: &str) -> Option<&RateLimit> {
        self.limits.iter().find(|limit| limit.matches(domain))
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RateLimit> {
        self.limits.iter()
    }
}
