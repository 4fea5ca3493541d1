//! Sliding-window limit on suggestion requests.
//!
//! Every accepted request records its timestamp; timestamps older than the
//! window are purged on each call. State is in-memory only and starts empty
//! whenever the process restarts, so this bounds request bursts, not a
//! persistent quota.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use zenmoji_core::clock::SystemClock;
//! use zenmoji_core::rate_limiter::{RateLimitConfig, RateLimiter};
//!
//! let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_secs(60)), SystemClock);
//! assert!(limiter.try_acquire());
//! assert!(limiter.try_acquire());
//! assert!(!limiter.try_acquire());
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::Clock;

/// Configuration for the rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum accepted requests inside one window.
    pub max_requests: usize,

    /// Length of the sliding window.
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

impl Default for RateLimitConfig {
    /// 5 requests per minute.
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(60),
        }
    }
}

/// Process-wide sliding-window counter. Clones share the same window.
#[derive(Clone)]
pub struct RateLimiter<C> {
    config: RateLimitConfig,
    clock: C,
    /// Accepted request timestamps, oldest first.
    window: Arc<Mutex<VecDeque<DateTime<Utc>>>>,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(config: RateLimitConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            window: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Record a request if the window has room.
    ///
    /// Returns false without recording anything when the limit is reached.
    pub fn try_acquire(&self) -> bool {
        let now = self.clock.now();
        let mut window = self.window.lock().unwrap_or_else(|p| p.into_inner());
        self.purge(&mut window, now);

        if window.len() >= self.config.max_requests {
            tracing::debug!(
                in_window = window.len(),
                max = self.config.max_requests,
                "Rate limit reached"
            );
            return false;
        }

        window.push_back(now);
        true
    }

    /// Requests still counted against the current window.
    pub fn in_flight(&self) -> usize {
        let now = self.clock.now();
        let mut window = self.window.lock().unwrap_or_else(|p| p.into_inner());
        self.purge(&mut window, now);
        window.len()
    }

    fn purge(&self, window: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
        let span = chrono::Duration::from_std(self.config.window).unwrap_or(chrono::TimeDelta::MAX);
        while let Some(&oldest) = window.front() {
            if now - oldest > span {
                window.pop_front();
            } else {
                break;
            }
        }
    }
}
