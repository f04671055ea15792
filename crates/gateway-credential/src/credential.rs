//! The credential record: one upstream API key's circuit breaker, rate limit
//! bucket, latency history, and health score.

use crate::circuit::{Circuit, CircuitConfig, CircuitState};
use gateway_core::ring::RingBuffer;
use gateway_ratelimiter::TokenBucket;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Instant;

/// Per-error-kind failure counters, mirroring the spec's `counters` field.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    pub total: u64,
    pub successes: u64,
    pub failures: u64,
    pub upstream_429: u64,
}

/// A credential's identity, stable across the pool index churn a hot-reload
/// removal causes (see `gateway_pool::Pool::reindex`). Derived from the
/// secret itself rather than assigned at insertion time, so two processes
/// loading the same credential file agree on it without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CredentialId(pub u64);

impl CredentialId {
    pub fn from_secret(secret: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        secret.hash(&mut hasher);
        CredentialId(hasher.finish())
    }
}

/// One upstream credential: the unit the pool selects among.
pub struct Credential {
    pub index: usize,
    secret: String,
    pub max_concurrency: u32,
    /// Priority tier for the `balanced` strategy's tie-break: lower sorts
    /// first. Only consulted after `(inFlight, healthScore, lastUsed)` — a
    /// low-priority credential with no load and a high score still wins.
    pub priority: u32,
    in_flight: u32,
    circuit: Circuit,
    bucket: TokenBucket,
    latencies: RingBuffer<f64>,
    counters: Counters,
    health_score: f64,
    last_used: Option<Instant>,
}

impl Credential {
    pub fn new(
        index: usize,
        secret: impl Into<String>,
        max_concurrency: u32,
        bucket: TokenBucket,
        latency_window: usize,
    ) -> Self {
        Self::with_priority(index, secret, max_concurrency, bucket, latency_window, 1)
    }

    pub fn with_priority(
        index: usize,
        secret: impl Into<String>,
        max_concurrency: u32,
        bucket: TokenBucket,
        latency_window: usize,
        priority: u32,
    ) -> Self {
        Self {
            index,
            secret: secret.into(),
            max_concurrency,
            priority,
            in_flight: 0,
            circuit: Circuit::new(),
            bucket,
            latencies: RingBuffer::new(latency_window),
            counters: Counters::default(),
            health_score: 100.0,
            last_used: None,
        }
    }

    /// Masked prefix only; the full secret never leaves this type.
    pub fn masked_secret(&self) -> String {
        let visible = self.secret.chars().take(4).collect::<String>();
        format!("{visible}***")
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Stable identity for stats/persistence keying — see [`CredentialId`].
    pub fn id(&self) -> CredentialId {
        CredentialId::from_secret(&self.secret)
    }

    pub fn state(&self) -> CircuitState {
        self.circuit.state()
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }

    pub fn health_score(&self) -> f64 {
        self.health_score
    }

    pub fn last_used(&self) -> Option<Instant> {
        self.last_used
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn p50(&self) -> Option<f64> {
        self.latencies.p50()
    }

    pub fn p95(&self) -> Option<f64> {
        self.latencies.p95()
    }

    pub fn p99(&self) -> Option<f64> {
        self.latencies.p99()
    }

    /// Requests per second served over the configured latency window, used
    /// as the `throughput` strategy's tie-breaker.
    pub fn throughput_per_second(&self, window_secs: f64) -> f64 {
        if window_secs <= 0.0 {
            return 0.0;
        }
        self.latencies.len() as f64 / window_secs
    }

    /// `state != OPEN` AND `cooldownUntil <= now` AND `inFlight < maxConcurrency`
    /// AND `bucket` has >= 1 token. Read-only: does not claim the circuit's
    /// half-open probe slot or consume a token — see [`Credential::commit_selection`].
    pub fn is_selectable(&mut self, config: &CircuitConfig) -> bool {
        if self.in_flight >= self.max_concurrency {
            return false;
        }
        if !self.bucket.peek() {
            return false;
        }
        self.circuit.peek(config)
    }

    /// The earliest moment this credential might become selectable again:
    /// `max(cooldownUntil, now + waitTimeMs)` — both the circuit and the
    /// bucket must clear before another probe makes sense.
    pub fn next_available_in_ms(&mut self) -> u64 {
        let wait_ms = self.bucket.wait_time_ms();
        let cooldown_ms = self
            .circuit
            .cooldown_until()
            .map(|until| until.saturating_duration_since(Instant::now()).as_millis() as u64)
            .unwrap_or(0);
        wait_ms.max(cooldown_ms)
    }

    /// Commits a selection: consumes one token, increments `inFlight`, and
    /// claims the circuit's half-open probe slot if applicable.
    pub fn commit_selection(&mut self) {
        self.bucket.try_consume(1.0);
        self.in_flight += 1;
        self.last_used = Some(Instant::now());
        self.circuit.commit_probe();
    }

    pub fn record_success(&mut self, latency_ms: f64) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.counters.total += 1;
        self.counters.successes += 1;
        self.latencies.push(latency_ms);
        self.circuit.record_success();
        self.recompute_health_score();
    }

    /// Returns the cooldown duration if this failure tripped the circuit.
    pub fn record_failure(
        &mut self,
        config: &CircuitConfig,
        latency_ms: f64,
        is_429: bool,
    ) -> Option<std::time::Duration> {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.counters.total += 1;
        self.counters.failures += 1;
        if is_429 {
            self.counters.upstream_429 += 1;
        }
        self.latencies.push(latency_ms);
        let tripped = self.circuit.record_failure(config);
        self.recompute_health_score();
        tripped
    }

    fn recompute_health_score(&mut self) {
        let success_rate = if self.counters.total > 0 {
            self.counters.successes as f64 / self.counters.total as f64
        } else {
            1.0
        };
        let latency_penalty = self
            .p95()
            .map(|p95| (p95 / 1000.0).min(1.0))
            .unwrap_or(0.0);
        let failure_density_penalty = (self.circuit.consecutive_failures() as f64 / 10.0).min(1.0);

        let score =
            100.0 * success_rate - 20.0 * latency_penalty - 30.0 * failure_density_penalty;
        self.health_score = score.clamp(0.0, 100.0);
    }

    pub fn force_open(&mut self, config: &CircuitConfig) {
        self.circuit.force_open(config);
    }

    pub fn force_closed(&mut self) {
        self.circuit.force_closed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> Credential {
        Credential::new(0, "sk-test-secret", 4, TokenBucket::new(10.0, 5.0, 5.0), 16)
    }

    #[test]
    fn masked_secret_never_exposes_full_value() {
        let c = credential();
        assert_eq!(c.masked_secret(), "sk-t***");
        assert!(!c.masked_secret().contains("test-secret"));
    }

    #[test]
    fn selectable_when_fresh() {
        let mut c = credential();
        assert!(c.is_selectable(&CircuitConfig::default()));
    }

    #[test]
    fn not_selectable_at_concurrency_ceiling() {
        let mut c = credential();
        for _ in 0..4 {
            c.commit_selection();
        }
        assert!(!c.is_selectable(&CircuitConfig::default()));
    }

    #[test]
    fn success_resets_consecutive_failures_and_improves_health() {
        let mut c = credential();
        c.commit_selection();
        c.record_failure(&CircuitConfig::default(), 50.0, false);
        let degraded = c.health_score();
        c.commit_selection();
        c.record_success(20.0);
        assert!(c.health_score() >= degraded);
    }

    #[test]
    fn in_flight_never_underflows_on_excess_completions() {
        let mut c = credential();
        c.record_success(10.0);
        assert_eq!(c.in_flight(), 0);
    }
}
