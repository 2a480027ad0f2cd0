//! Sliding-window rate limiting keyed by string.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("too many requests for '{key}', retry in {}s", .retry_after.num_seconds())]
pub struct RateLimited {
    pub key: String,
    pub retry_after: Duration,
}

/// Allows at most `max_requests` hits per key within any `window`.
///
/// Time is always passed in by the caller; the limiter never reads a clock.
/// Idle keys are dropped every `PURGE_EVERY` checks.
const PURGE_EVERY: u32 = 256;

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: HashMap<String, VecDeque<DateTime<Utc>>>,
    checks_since_purge: u32,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: HashMap::new(),
            checks_since_purge: 0,
        }
    }

    /// Record a hit for `key` at `now`, or fail if the window is full.
    pub fn check(&mut self, key: &str, now: DateTime<Utc>) -> Result<(), RateLimited> {
        self.checks_since_purge += 1;
        if self.checks_since_purge >= PURGE_EVERY {
            self.checks_since_purge = 0;
            self.purge(now);
        }

        let cutoff = now - self.window;
        let hits = self.hits.entry(key.to_string()).or_default();
        while hits.front().is_some_and(|t| *t <= cutoff) {
            hits.pop_front();
        }

        if hits.len() >= self.max_requests {
            let retry_after = hits
                .front()
                .map(|oldest| *oldest + self.window - now)
                .unwrap_or(self.window);
            return Err(RateLimited {
                key: key.to_string(),
                retry_after,
            });
        }

        hits.push_back(now);
        Ok(())
    }

    /// Hits still allowed for `key` at `now`.
    pub fn remaining(&self, key: &str, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        let used = self
            .hits
            .get(key)
            .map_or(0, |hits| hits.iter().filter(|t| **t > cutoff).count());
        self.max_requests.saturating_sub(used)
    }

    pub fn reset(&mut self, key: &str) {
        self.hits.remove(key);
    }

    /// Drop keys with no hit inside the window.
    pub fn purge(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        self.hits
            .retain(|_, hits| hits.back().is_some_and(|t| *t > cutoff));
    }
}

impl Default for RateLimiter {
    /// Five hits a minute.
    fn default() -> Self {
        Self::new(5, Duration::minutes(1))
    }
}
