//! The credential pool: selection, completion feedback, and the pool-wide
//! 429 cooldown.

use crate::strategy::SelectionStrategy;
use gateway_credential::{CircuitConfig, Credential};
use gateway_ratelimiter::TokenBucket;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// One slot in the pool: a credential plus whether it is draining (removed
/// by a hot-reload but still serving in-flight requests).
pub struct Slot {
    pub credential: Credential,
    pub draining: bool,
}

/// Tracks the pool-wide 429 rate and the resulting short cooldown, grounded
/// on spec §4.2's "pool-level rate-limit protection" clause — a rolling
/// window of 429 timestamps across every credential, same sliding-window
/// shape as `Circuit`'s own `recent_failures`.
struct Pool429Tracker {
    recent: VecDeque<Instant>,
    window: Duration,
    rate_threshold: f64,
    cooldown: Duration,
    cooldown_until: Option<Instant>,
}

impl Pool429Tracker {
    fn new(window: Duration, rate_threshold: f64, cooldown: Duration) -> Self {
        Self {
            recent: VecDeque::new(),
            window,
            rate_threshold,
            cooldown,
            cooldown_until: None,
        }
    }

    fn record(&mut self) {
        let now = Instant::now();
        while let Some(&front) = self.recent.front() {
            if now.duration_since(front) > self.window {
                self.recent.pop_front();
            } else {
                break;
            }
        }
        self.recent.push_back(now);
        let density = self.recent.len() as f64 / self.window.as_secs_f64();
        if density >= self.rate_threshold {
            self.cooldown_until = Some(now + self.cooldown);
        }
    }

    fn active_cooldown(&mut self) -> Option<Duration> {
        let now = Instant::now();
        match self.cooldown_until {
            Some(until) if until > now => Some(until.saturating_duration_since(now)),
            Some(_) => {
                self.cooldown_until = None;
                None
            }
            None => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub circuit: CircuitConfig,
    pub pool_429_window: Duration,
    pub pool_429_rate_threshold: f64,
    pub pool_429_cooldown: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            circuit: CircuitConfig::default(),
            pool_429_window: Duration::from_secs(10),
            pool_429_rate_threshold: 0.5,
            pool_429_cooldown: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    Selected(usize),
    /// No credential currently selectable; retry after this many milliseconds.
    Cold { retry_after_ms: u64 },
}

pub struct Pool {
    slots: Vec<Slot>,
    strategy: SelectionStrategy,
    config: PoolConfig,
    pool_429: Pool429Tracker,
}

impl Pool {
    pub fn new(strategy: SelectionStrategy, config: PoolConfig) -> Self {
        let pool_429 = Pool429Tracker::new(
            config.pool_429_window,
            config.pool_429_rate_threshold,
            config.pool_429_cooldown,
        );
        Self {
            slots: Vec::new(),
            strategy,
            config,
            pool_429,
        }
    }

    pub fn push(&mut self, credential: Credential) {
        self.slots.push(Slot {
            credential,
            draining: false,
        });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn credential(&self, index: usize) -> Option<&Credential> {
        self.slots.get(index).map(|s| &s.credential)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// The stable identity of every credential currently in the pool, in
    /// slot order — what a caller passes to `gateway_stats::StatsAggregator`
    /// so its per-credential listing survives a discard-triggered reindex.
    pub fn credential_ids(&self) -> Vec<gateway_credential::CredentialId> {
        self.slots.iter().map(|s| s.credential.id()).collect()
    }

    /// Selects a credential per spec §4.2: filter to selectable, sort by the
    /// strategy's comparator, commit the winner.
    pub fn select(&mut self) -> SelectOutcome {
        if let Some(remaining) = self.pool_429.active_cooldown() {
            return SelectOutcome::Cold {
                retry_after_ms: remaining.as_millis() as u64,
            };
        }

        let cfg = self.config.circuit.clone();
        let mut selectable = Vec::with_capacity(self.slots.len());
        let mut earliest_ms = u64::MAX;
        for slot in self.slots.iter_mut() {
            if slot.draining {
                continue;
            }
            if slot.credential.is_selectable(&cfg) {
                selectable.push(slot.credential.index);
            } else {
                earliest_ms = earliest_ms.min(slot.credential.next_available_in_ms());
            }
        }

        if selectable.is_empty() {
            return SelectOutcome::Cold {
                retry_after_ms: if earliest_ms == u64::MAX {
                    0
                } else {
                    earliest_ms
                },
            };
        }

        let chosen = {
            let snapshot: Vec<&Credential> = self.slots.iter().map(|s| &s.credential).collect();
            self.strategy
                .pick_among(&selectable, &snapshot)
                .expect("selectable is non-empty")
        };
        self.slots[chosen].credential.commit_selection();
        SelectOutcome::Selected(chosen)
    }

    pub fn record_success(&mut self, index: usize, latency_ms: f64) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.credential.record_success(latency_ms);
        }
        self.maybe_discard_drained(index);
    }

    pub fn record_failure(&mut self, index: usize, latency_ms: f64, is_429: bool) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.credential
                .record_failure(&self.config.circuit, latency_ms, is_429);
        }
        if is_429 {
            self.pool_429.record();
        }
        self.maybe_discard_drained(index);
    }

    fn maybe_discard_drained(&mut self, index: usize) {
        if let Some(slot) = self.slots.get(index) {
            if slot.draining && slot.credential.in_flight() == 0 {
                self.slots.remove(index);
                self.reindex();
            }
        }
    }

    fn reindex(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.credential.index = i;
        }
    }

    pub fn mark_draining(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.draining = true;
        }
    }

    /// Pool-wide aggregate health: mean of non-draining credentials' scores,
    /// or `0.0` if the pool is empty.
    pub fn aggregate_health(&self) -> f64 {
        let active: Vec<f64> = self
            .slots
            .iter()
            .filter(|s| !s.draining)
            .map(|s| s.credential.health_score())
            .collect();
        if active.is_empty() {
            0.0
        } else {
            active.iter().sum::<f64>() / active.len() as f64
        }
    }

    pub fn force_open(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.credential.force_open(&self.config.circuit);
        }
    }

    pub fn force_closed(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.credential.force_closed();
        }
    }
}

/// Builds a fresh [`Credential`] for a newly added secret, starting `CLOSED`
/// per spec §4.2's hot-reload rule.
pub fn new_credential(
    index: usize,
    secret: impl Into<String>,
    max_concurrency: u32,
    capacity: f64,
    burst: f64,
    refill_per_second: f64,
    latency_window: usize,
) -> Credential {
    new_credential_with_priority(index, secret, max_concurrency, capacity, burst, refill_per_second, latency_window, 1)
}

/// Same as [`new_credential`] but with an explicit priority tier for the
/// `balanced` strategy's tie-break (lower sorts first, default `1`).
#[allow(clippy::too_many_arguments)]
pub fn new_credential_with_priority(
    index: usize,
    secret: impl Into<String>,
    max_concurrency: u32,
    capacity: f64,
    burst: f64,
    refill_per_second: f64,
    latency_window: usize,
    priority: u32,
) -> Credential {
    let bucket = TokenBucket::new(capacity, burst, refill_per_second);
    Credential::with_priority(index, secret, max_concurrency, bucket, latency_window, priority)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with(n: usize) -> Pool {
        let mut pool = Pool::new(SelectionStrategy::Balanced, PoolConfig::default());
        for i in 0..n {
            pool.push(new_credential(i, format!("sk-{i}"), 4, 10.0, 5.0, 5.0, 16));
        }
        pool
    }

    #[test]
    fn selects_among_fresh_credentials() {
        let mut pool = pool_with(3);
        let outcome = pool.select();
        assert!(matches!(outcome, SelectOutcome::Selected(_)));
    }

    #[test]
    fn cold_pool_reports_retry_after() {
        let mut pool = Pool::new(SelectionStrategy::Balanced, PoolConfig::default());
        let outcome = pool.select();
        assert_eq!(outcome, SelectOutcome::Cold { retry_after_ms: 0 });
    }

    #[test]
    fn success_feedback_decrements_in_flight() {
        let mut pool = pool_with(1);
        let idx = match pool.select() {
            SelectOutcome::Selected(i) => i,
            _ => panic!("expected selection"),
        };
        assert_eq!(pool.credential(idx).unwrap().in_flight(), 1);
        pool.record_success(idx, 20.0);
        assert_eq!(pool.credential(idx).unwrap().in_flight(), 0);
    }

    #[test]
    fn draining_credential_is_discarded_once_idle() {
        let mut pool = pool_with(2);
        let idx = match pool.select() {
            SelectOutcome::Selected(i) => i,
            _ => panic!("expected selection"),
        };
        pool.mark_draining(idx);
        assert_eq!(pool.len(), 2);
        pool.record_success(idx, 10.0);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn pool_wide_429_cooldown_trips_after_rate_threshold() {
        let mut config = PoolConfig::default();
        config.pool_429_window = Duration::from_millis(200);
        config.pool_429_rate_threshold = 2.0;
        config.pool_429_cooldown = Duration::from_millis(50);
        let mut pool = Pool::new(SelectionStrategy::Balanced, config);
        for i in 0..2 {
            pool.push(new_credential(i, format!("sk-{i}"), 4, 10.0, 5.0, 5.0, 16));
        }
        for _ in 0..3 {
            pool.record_failure(0, 10.0, true);
        }
        let outcome = pool.select();
        assert!(matches!(outcome, SelectOutcome::Cold { .. }));
    }
}
