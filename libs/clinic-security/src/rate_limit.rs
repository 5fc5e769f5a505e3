//! Process-wide sliding-window request counter.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Every this many hits, keys idle for a whole window are dropped.
const SWEEP_EVERY: u64 = 256;

/// Counts hits per key inside a trailing time window.
///
/// Shared between requests behind an `Arc`; each key has its own bucket so
/// unrelated callers never contend on the same entry.
#[derive(Debug, Default)]
pub struct SlidingWindowLimiter {
    buckets: DashMap<String, VecDeque<Instant>>,
    hits: AtomicU64,
}

impl SlidingWindowLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hit for `key` unless it already reached `limit` hits within
    /// `window`. Returns `true` when the caller must be rejected.
    pub fn is_limited(&self, key: &str, limit: usize, window: Duration) -> bool {
        self.is_limited_at(key, limit, window, Instant::now())
    }

    pub fn is_limited_at(&self, key: &str, limit: usize, window: Duration, now: Instant) -> bool {
        if self.hits.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.cleanup(window, now);
        }

        let mut bucket = self.buckets.entry(key.to_owned()).or_default();
        prune(&mut bucket, window, now);
        if bucket.len() >= limit {
            return true;
        }
        bucket.push_back(now);
        false
    }

    /// Drop every key with no hit inside `window`.
    pub fn cleanup(&self, window: Duration, now: Instant) {
        self.buckets.retain(|_, bucket| {
            prune(bucket, window, now);
            !bucket.is_empty()
        });
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }
}

fn prune(bucket: &mut VecDeque<Instant>, window: Duration, now: Instant) {
    while bucket
        .front()
        .is_some_and(|oldest| now.saturating_duration_since(*oldest) >= window)
    {
        bucket.pop_front();
    }
}
