use crate::error::{IronlayerError, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

/// Per-tenant sliding-window limiter: a deque of request timestamps per
/// key, pruned on every check (spec.md §4.7).
pub struct SlidingWindowLimiter {
    window: Duration,
    limit: u32,
    buckets: Mutex<BTreeMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(window_secs: u64, limit: u32) -> Self {
        Self {
            window: Duration::from_secs(window_secs),
            limit,
            buckets: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns `Ok(())` and records the request, or `RateLimited` with the
    /// number of seconds until the oldest request in the window expires.
    pub fn check(&self, key: &str, now: Instant) -> Result<()> {
        let mut buckets = self.buckets.lock();
        let deque = buckets.entry(key.to_string()).or_default();
        while let Some(front) = deque.front() {
            if now.duration_since(*front) > self.window {
                deque.pop_front();
            } else {
                break;
            }
        }
        if deque.len() as u32 >= self.limit {
            let retry_after = deque
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            return Err(IronlayerError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            });
        }
        deque.push_back(now);
        Ok(())
    }

    /// Drops buckets untouched for longer than `retention`, so the map
    /// doesn't grow unbounded with stale keys.
    pub fn evict_stale(&self, now: Instant, retention: Duration) {
        let mut buckets = self.buckets.lock();
        buckets.retain(|_, deque| {
            deque
                .back()
                .map(|last| now.duration_since(*last) <= retention)
                .unwrap_or(false)
        });
    }
}

const BACKOFF_SCHEDULE_SECS: [u64; 5] = [30, 60, 120, 240, 900];

/// Tracks login failures per `(email, ip)` pair and enforces exponential
/// backoff after a threshold of consecutive failures, reset on success
/// (spec.md §4.7).
pub struct LoginBackoff {
    threshold: u32,
    state: Mutex<BTreeMap<String, (u32, Instant)>>,
}

impl LoginBackoff {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            state: Mutex::new(BTreeMap::new()),
        }
    }

    fn key(email: &str, ip: &str) -> String {
        format!("{email}|{ip}")
    }

    pub fn record_failure(&self, email: &str, ip: &str, now: Instant) {
        let mut state = self.state.lock();
        let entry = state.entry(Self::key(email, ip)).or_insert((0, now));
        entry.0 += 1;
        entry.1 = now;
    }

    pub fn record_success(&self, email: &str, ip: &str) {
        self.state.lock().remove(&Self::key(email, ip));
    }

    /// `Err` carries the remaining backoff in seconds.
    pub fn check(&self, email: &str, ip: &str, now: Instant) -> Result<()> {
        let state = self.state.lock();
        let Some((failures, last_failure)) = state.get(&Self::key(email, ip)) else {
            return Ok(());
        };
        if *failures < self.threshold {
            return Ok(());
        }
        let step = (*failures - self.threshold) as usize;
        let backoff_secs = BACKOFF_SCHEDULE_SECS[step.min(BACKOFF_SCHEDULE_SECS.len() - 1)];
        let elapsed = now.duration_since(*last_failure).as_secs();
        if elapsed >= backoff_secs {
            return Ok(());
        }
        Err(IronlayerError::RateLimited {
            retry_after_secs: backoff_secs - elapsed,
        })
    }
}
