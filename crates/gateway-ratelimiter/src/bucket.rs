//! A single per-key token bucket with lazy, continuous refill.

use std::time::{Duration, Instant};

/// `capacity + burst` tokens, refilled continuously at `refill_per_second`.
///
/// Refill happens lazily on every call rather than via a background task, the
/// same "compute on access" idiom `FixedWindowState`/`SlidingLogState` used for
/// fixed/sliding windows, generalized here to continuous refill with burst.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    burst: f64,
    refill_per_second: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: f64, burst: f64, refill_per_second: f64) -> Self {
        Self {
            capacity,
            burst,
            refill_per_second,
            tokens: capacity + burst,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        let ceiling = self.capacity + self.burst;
        self.tokens = (self.tokens + elapsed * self.refill_per_second).min(ceiling);
        self.last_refill = now;
    }

    /// Refills, then attempts to consume `n` tokens. Mutating: decrements on success.
    pub fn try_consume(&mut self, n: f64) -> bool {
        self.refill();
        if self.tokens >= n {
            self.tokens -= n;
            true
        } else {
            false
        }
    }

    /// Refills, then checks availability without consuming.
    pub fn peek(&mut self) -> bool {
        self.refill();
        self.tokens >= 1.0
    }

    /// Milliseconds until at least one token is available, 0 if already available.
    pub fn wait_time_ms(&mut self) -> u64 {
        self.refill();
        if self.tokens >= 1.0 {
            return 0;
        }
        if self.refill_per_second <= 0.0 {
            return u64::MAX;
        }
        let seconds = (1.0 - self.tokens) / self.refill_per_second;
        (seconds * 1000.0).ceil() as u64
    }

    /// Resets to a full bucket (capacity + burst).
    pub fn reset(&mut self) {
        self.tokens = self.capacity + self.burst;
        self.last_refill = Instant::now();
    }

    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }

    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.last_refill.elapsed() >= ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_full_at_capacity_plus_burst() {
        let mut b = TokenBucket::new(10.0, 5.0, 1.0);
        assert!(b.peek());
        assert!(b.try_consume(15.0));
        assert!(!b.try_consume(1.0));
    }

    #[test]
    fn peek_does_not_consume() {
        let mut b = TokenBucket::new(1.0, 0.0, 1.0);
        assert!(b.peek());
        assert!(b.peek());
        assert!(b.try_consume(1.0));
        assert!(!b.peek());
    }

    #[test]
    fn try_consume_fails_and_leaves_tokens_untouched_when_insufficient() {
        let mut b = TokenBucket::new(1.0, 0.0, 1.0);
        assert!(b.try_consume(1.0));
        assert!(!b.try_consume(1.0));
        assert!(!b.try_consume(1.0));
    }

    #[test]
    fn wait_time_is_zero_when_tokens_available() {
        let mut b = TokenBucket::new(5.0, 0.0, 1.0);
        assert_eq!(b.wait_time_ms(), 0);
    }

    #[test]
    fn wait_time_reflects_refill_rate_when_empty() {
        let mut b = TokenBucket::new(1.0, 0.0, 2.0);
        assert!(b.try_consume(1.0));
        let wait = b.wait_time_ms();
        assert!(wait > 0 && wait <= 500);
    }

    #[test]
    fn reset_restores_full_bucket() {
        let mut b = TokenBucket::new(2.0, 1.0, 1.0);
        assert!(b.try_consume(3.0));
        b.reset();
        assert!(b.try_consume(3.0));
    }

    #[test]
    fn never_exceeds_capacity_plus_burst_ceiling() {
        let mut b = TokenBucket::new(2.0, 1.0, 1000.0);
        std::thread::sleep(Duration::from_millis(20));
        b.refill();
        assert!(b.tokens <= 3.0 + f64::EPSILON);
    }
}
