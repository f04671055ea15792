//! Per-key token bucket rate limiting for the credential pool.
//!
//! [`bucket::TokenBucket`] is the single-key primitive. [`RateLimiter`] owns a
//! `DashMap<usize, TokenBucket>` keyed by credential index, lazily allocating
//! a bucket on first use and sweeping stale entries on a TTL, the same map
//! shape `flowtrace-server::middleware::rate_limit::RateLimiter` uses for its
//! per-tenant `DashMap<u64, (u32, Instant)>`.

pub mod bucket;
pub mod error;

pub use bucket::TokenBucket;
pub use error::RateLimiterError;

use dashmap::DashMap;
use std::time::Duration;

/// Parameters a bucket is constructed with, shared by every key until a
/// credential's config changes on hot-reload.
#[derive(Debug, Clone, Copy)]
pub struct BucketParams {
    pub capacity: f64,
    pub burst: f64,
    pub refill_per_second: f64,
}

/// Owns one [`TokenBucket`] per credential index.
pub struct RateLimiter {
    buckets: DashMap<usize, TokenBucket>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Registers or replaces the bucket for `key`, resetting it to full.
    pub fn register(&self, key: usize, params: BucketParams) {
        self.buckets.insert(
            key,
            TokenBucket::new(params.capacity, params.burst, params.refill_per_second),
        );
    }

    pub fn remove(&self, key: usize) {
        self.buckets.remove(&key);
    }

    /// Non-mutating availability check, used at admission/selection time.
    pub fn peek(&self, key: usize) -> Result<bool, RateLimiterError> {
        let mut entry = self
            .buckets
            .get_mut(&key)
            .ok_or(RateLimiterError::UnknownKey(key))?;
        Ok(entry.peek())
    }

    /// Consumes `n` tokens, used at dispatch time. See the crate-level
    /// peek-at-admission / consume-at-dispatch split.
    pub fn try_consume(&self, key: usize, n: f64) -> Result<bool, RateLimiterError> {
        let mut entry = self
            .buckets
            .get_mut(&key)
            .ok_or(RateLimiterError::UnknownKey(key))?;
        Ok(entry.try_consume(n))
    }

    pub fn wait_time_ms(&self, key: usize) -> Result<u64, RateLimiterError> {
        let mut entry = self
            .buckets
            .get_mut(&key)
            .ok_or(RateLimiterError::UnknownKey(key))?;
        Ok(entry.wait_time_ms())
    }

    pub fn reset(&self, key: usize) -> Result<(), RateLimiterError> {
        let mut entry = self
            .buckets
            .get_mut(&key)
            .ok_or(RateLimiterError::UnknownKey(key))?;
        entry.reset();
        Ok(())
    }

    pub fn contains(&self, key: usize) -> bool {
        self.buckets.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drops every bucket whose `last_refill` is older than `ttl`. Intended
    /// to run periodically so removed credentials don't leak bucket state.
    pub fn cleanup(&self, ttl: Duration) {
        self.buckets.retain(|_, bucket| !bucket.is_stale(ttl));
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BucketParams {
        BucketParams {
            capacity: 5.0,
            burst: 2.0,
            refill_per_second: 1.0,
        }
    }

    #[test]
    fn unknown_key_returns_error() {
        let rl = RateLimiter::new();
        assert_eq!(rl.peek(0), Err(RateLimiterError::UnknownKey(0)));
    }

    #[test]
    fn register_then_peek_and_consume() {
        let rl = RateLimiter::new();
        rl.register(0, params());
        assert!(rl.peek(0).unwrap());
        assert!(rl.try_consume(0, 7.0).unwrap());
        assert!(!rl.try_consume(0, 1.0).unwrap());
    }

    #[test]
    fn peek_never_mutates_state() {
        let rl = RateLimiter::new();
        rl.register(0, params());
        for _ in 0..10 {
            assert!(rl.peek(0).unwrap());
        }
        assert!(rl.try_consume(0, 7.0).unwrap());
    }

    #[test]
    fn remove_drops_bucket() {
        let rl = RateLimiter::new();
        rl.register(0, params());
        rl.remove(0);
        assert!(!rl.contains(0));
    }

    #[test]
    fn cleanup_sweeps_stale_buckets_by_ttl() {
        let rl = RateLimiter::new();
        rl.register(0, params());
        rl.register(1, params());
        rl.cleanup(Duration::from_millis(0));
        assert!(rl.is_empty(), "both buckets should already be stale at ttl=0");
    }

    #[test]
    fn cleanup_keeps_fresh_buckets() {
        let rl = RateLimiter::new();
        rl.register(0, params());
        rl.cleanup(Duration::from_secs(60));
        assert_eq!(rl.len(), 1);
    }
}
