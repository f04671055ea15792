//! Backoff interval strategies shared by the credential pool's cooldown and
//! the forwarder's inter-attempt delay.

use std::time::Duration;

/// Computes the delay before attempt `attempt` (0-indexed: the first retry is
/// attempt 1, since attempt 0 is the initial try).
pub trait IntervalFunction: Send + Sync {
    fn interval(&self, attempt: u32) -> Duration;
}

/// A constant delay regardless of attempt number.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    delay: Duration,
}

impl FixedInterval {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl IntervalFunction for FixedInterval {
    fn interval(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Doubles the delay on each attempt, capped at `max`.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            max: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }

    pub fn with_max(mut self, max: Duration) -> Self {
        self.max = max;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    fn unjittered(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let scaled = self.initial.as_secs_f64() * factor;
        Duration::from_secs_f64(scaled).min(self.max)
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn interval(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        self.unjittered(attempt)
    }
}

/// Exponential backoff with a randomization factor: the delay is drawn
/// uniformly from `[base * (1 - factor), base * (1 + factor)]`. The credential
/// pool uses a factor of 0.2 (the spec's "±20% jitter"); the forwarder's
/// inter-attempt delay reuses the same shape.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialRandomBackoff {
    inner: ExponentialBackoff,
    randomization_factor: f64,
}

impl ExponentialRandomBackoff {
    pub fn new(initial: Duration, randomization_factor: f64) -> Self {
        Self {
            inner: ExponentialBackoff::new(initial),
            randomization_factor: randomization_factor.clamp(0.0, 1.0),
        }
    }

    pub fn with_max(mut self, max: Duration) -> Self {
        self.inner = self.inner.with_max(max);
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.inner = self.inner.with_multiplier(multiplier);
        self
    }
}

impl IntervalFunction for ExponentialRandomBackoff {
    fn interval(&self, attempt: u32) -> Duration {
        let base = self.inner.interval(attempt);
        if base.is_zero() || self.randomization_factor == 0.0 {
            return base;
        }
        let jitter = rand::random::<f64>() * 2.0 - 1.0; // [-1.0, 1.0]
        let scale = 1.0 + jitter * self.randomization_factor;
        Duration::from_secs_f64((base.as_secs_f64() * scale).max(0.0))
    }
}
