//! Fixed-window rate limiter.
//!
//! Keys are hashed client IPs. Each key gets a counter that resets
//! when its window elapses. State lives in this struct; there are no
//! globals, so tests and multiple instances stay independent.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Entry count above which expired windows are purged opportunistically.
const PURGE_THRESHOLD: usize = 10_000;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Milliseconds until the window resets.
    pub reset_in_ms: i64,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Per-key fixed-window rate limiter.
pub struct RateLimiter {
    window_ms: u64,
    max_requests: u32,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(window_ms: u64, max_requests: u32) -> Self {
        Self {
            window_ms,
            max_requests,
            windows: DashMap::new(),
        }
    }

    /// Record a request for `key` and decide whether it is allowed.
    pub fn check(&self, key: &str, now: DateTime<Utc>) -> RateLimitDecision {
        self.maybe_purge(now);

        let window_len = Duration::milliseconds(self.window_ms as i64);
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now - entry.started_at >= window_len {
            entry.started_at = now;
            entry.count = 0;
        }

        let reset_in_ms = (entry.started_at + window_len - now).num_milliseconds();
        if entry.count >= self.max_requests {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_in_ms,
            };
        }

        entry.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: self.max_requests - entry.count,
            reset_in_ms,
        }
    }

    /// Drop expired windows once the map grows past the threshold.
    fn maybe_purge(&self, now: DateTime<Utc>) {
        if self.windows.len() <= PURGE_THRESHOLD {
            return;
        }
        let window_len = Duration::milliseconds(self.window_ms as i64);
        self.windows.retain(|_, w| now - w.started_at < window_len);
    }

    #[cfg(test)]
    fn entry_count(&self) -> usize {
        self.windows.len()
    }
}
