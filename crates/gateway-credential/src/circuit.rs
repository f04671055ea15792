//! Per-credential circuit breaker state machine.

use gateway_retry::backoff::{ExponentialRandomBackoff, IntervalFunction};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// `CLOSED | HALF_OPEN | OPEN`, with an atomic shadow copy so `/stats` can
/// read the state lock-free, the same `state_atomic` idiom
/// `tower_resilience_circuitbreaker::circuit::Circuit` uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open,
        }
    }
}

/// Parameters governing when a credential's circuit trips and how long it
/// cools down.
#[derive(Debug, Clone)]
pub struct CircuitConfig {
    /// Failures-per-second threshold over `window` that trips the circuit.
    pub failure_rate_threshold: f64,
    /// `W_cb`: the sliding window over which `recentFailures` is counted.
    pub window: Duration,
    /// Base delay for the exponential cooldown curve.
    pub cooldown_base: Duration,
    /// Ceiling every cooldown (initial trip or doubled half-open failure) is capped at.
    pub cooldown_cap: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            window: Duration::from_secs(30),
            cooldown_base: Duration::from_millis(500),
            cooldown_cap: Duration::from_secs(60),
        }
    }
}

pub struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    consecutive_failures: u32,
    recent_failures: VecDeque<Instant>,
    cooldown_until: Option<Instant>,
    last_cooldown: Duration,
    half_open_probe_in_flight: bool,
    last_state_change: Instant,
}

impl Circuit {
    pub fn new() -> Self {
        Self::new_with_atomic(Arc::new(AtomicU8::new(CircuitState::Closed as u8)))
    }

    pub fn new_with_atomic(state_atomic: Arc<AtomicU8>) -> Self {
        Self {
            state: CircuitState::Closed,
            state_atomic,
            consecutive_failures: 0,
            recent_failures: VecDeque::new(),
            cooldown_until: None,
            last_cooldown: Duration::ZERO,
            half_open_probe_in_flight: false,
            last_state_change: Instant::now(),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn cooldown_until(&self) -> Option<Instant> {
        self.cooldown_until
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Read-only selectability test: `state != OPEN` AND `cooldownUntil <=
    /// now` AND (if `HALF_OPEN`) no probe already in flight. An elapsed
    /// cooldown still transitions `OPEN -> HALF_OPEN` here (there is no
    /// separate timer driving that transition), but does not itself claim
    /// the single half-open probe slot — callers that actually intend to use
    /// the result must call [`Circuit::commit_probe`].
    pub fn peek(&mut self, _config: &CircuitConfig) -> bool {
        let now = Instant::now();
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = match self.cooldown_until {
                    Some(until) => now >= until,
                    None => true,
                };
                if elapsed {
                    self.transition_to(CircuitState::HalfOpen);
                    !self.half_open_probe_in_flight
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => !self.half_open_probe_in_flight,
        }
    }

    /// Claims the single in-flight half-open probe slot. A no-op outside
    /// `HALF_OPEN` (closed needs no slot; open is never selectable).
    pub fn commit_probe(&mut self) {
        if self.state == CircuitState::HalfOpen {
            self.half_open_probe_in_flight = true;
        }
    }

    /// Convenience for single-candidate call sites: peek and immediately
    /// commit if selectable. The pool's multi-candidate selection instead
    /// calls `peek` on every candidate and `commit_probe` only on the one it
    /// actually chooses, so a round that considers several half-open
    /// credentials doesn't spuriously consume all of their probe slots.
    pub fn try_acquire(&mut self, config: &CircuitConfig) -> bool {
        if self.peek(config) {
            self.commit_probe();
            true
        } else {
            false
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        if self.state == CircuitState::HalfOpen {
            self.half_open_probe_in_flight = false;
            self.cooldown_until = None;
            self.last_cooldown = Duration::ZERO;
            self.transition_to(CircuitState::Closed);
        }
    }

    /// Records a failure classified as countable toward the circuit (spec
    /// §4.2: "retriable-upstream or rate-limit"). Returns the new cooldown if
    /// this call tripped the circuit.
    pub fn record_failure(&mut self, config: &CircuitConfig) -> Option<Duration> {
        let now = Instant::now();
        self.consecutive_failures += 1;
        self.prune_window(config.window, now);
        self.recent_failures.push_back(now);

        match self.state {
            CircuitState::HalfOpen => {
                self.half_open_probe_in_flight = false;
                let doubled = self
                    .last_cooldown
                    .saturating_mul(2)
                    .min(config.cooldown_cap);
                let cooldown = if doubled.is_zero() {
                    config.cooldown_base
                } else {
                    doubled
                };
                self.trip(cooldown);
                Some(cooldown)
            }
            CircuitState::Closed => {
                let density = self.recent_failures.len() as f64 / config.window.as_secs_f64();
                if density >= config.failure_rate_threshold {
                    let cooldown = self.backoff_for(config, self.consecutive_failures);
                    self.trip(cooldown);
                    Some(cooldown)
                } else {
                    None
                }
            }
            CircuitState::Open => None,
        }
    }

    fn backoff_for(&self, config: &CircuitConfig, consecutive_failures: u32) -> Duration {
        ExponentialRandomBackoff::new(config.cooldown_base, 0.2)
            .with_max(config.cooldown_cap)
            .interval(consecutive_failures)
    }

    fn trip(&mut self, cooldown: Duration) {
        let now = Instant::now();
        self.cooldown_until = Some(now + cooldown);
        self.last_cooldown = cooldown;
        self.transition_to(CircuitState::Open);
    }

    fn prune_window(&mut self, window: Duration, now: Instant) {
        while let Some(&front) = self.recent_failures.front() {
            if now.duration_since(front) > window {
                self.recent_failures.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn force_open(&mut self, config: &CircuitConfig) {
        self.trip(config.cooldown_cap);
    }

    pub fn force_closed(&mut self) {
        self.consecutive_failures = 0;
        self.recent_failures.clear();
        self.cooldown_until = None;
        self.last_cooldown = Duration::ZERO;
        self.half_open_probe_in_flight = false;
        self.transition_to(CircuitState::Closed);
    }

    fn transition_to(&mut self, state: CircuitState) {
        if self.state == state {
            return;
        }
        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.last_state_change = Instant::now();
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}
