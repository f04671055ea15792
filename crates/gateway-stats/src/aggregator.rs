//! Ties the per-credential counters, global counters and cost tracker
//! together, and debounces them out to disk through `gateway-persistence` —
//! the same periodic-tick shape as `flowtrace-server`'s `retention_worker`,
//! just ticking a snapshot write instead of a cleanup sweep.

use crate::cost::{CostBudget, CostTracker, PersistedCost};
use crate::counters::{CredentialCountersSnapshot, PerCredentialCounters};
use crate::global::{GlobalCounters, GlobalCountersSnapshot};
use crate::snapshot::{CostStatsSnapshot, StatsSnapshot};
use chrono::Utc;
use gateway_credential::CredentialId;
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Everything the aggregator writes to disk. `budget` is excluded on
/// purpose — see [`PersistedCost`].
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct PersistedState {
    global: GlobalCountersSnapshot,
    credentials: Vec<CredentialCountersSnapshot>,
    cost: PersistedCost,
}

pub struct StatsAggregatorConfig {
    pub snapshot_path: Option<PathBuf>,
    pub flush_interval: Duration,
    pub latency_window: usize,
    pub cost_budget: CostBudget,
}

/// Reduces records emitted by every other component. Never reaches back into
/// `gateway-pool` or `gateway-admission` — those are merged in by the server
/// when it assembles the HTTP response.
pub struct StatsAggregator {
    credentials: RwLock<PerCredentialCounters>,
    global: GlobalCounters,
    cost: Mutex<CostTracker>,
    snapshot_path: Option<PathBuf>,
    latency_window: usize,
}

impl StatsAggregator {
    /// `initial_ids` is the pool's credential set at startup, in pool order —
    /// only used to pre-seed zeroed counters so a never-yet-used credential
    /// still shows up in `/stats`; lookups themselves are id-keyed and don't
    /// depend on this ordering.
    pub fn new(initial_ids: &[CredentialId], config: StatsAggregatorConfig) -> Self {
        let restored = config
            .snapshot_path
            .as_deref()
            .map(|path| gateway_persistence::atomic_read::<PersistedState>(path));

        let (global, mut credentials, cost) = match restored {
            Some(state) if !state.credentials.is_empty() || state.global.total_requests > 0 => (
                GlobalCounters::restore(state.global),
                PerCredentialCounters::restore(state.credentials, config.latency_window),
                CostTracker::restore(state.cost, config.cost_budget),
            ),
            _ => (
                GlobalCounters::default(),
                PerCredentialCounters::new(&[], config.latency_window),
                CostTracker::new(config.cost_budget),
            ),
        };
        for id in initial_ids {
            credentials.ensure(*id);
        }

        Self {
            credentials: RwLock::new(credentials),
            global,
            cost: Mutex::new(cost),
            snapshot_path: config.snapshot_path,
            latency_window: config.latency_window,
        }
    }

    /// Brings the id set up to date with the pool after a hot reload: adds a
    /// zeroed entry for every id the pool now carries that wasn't already
    /// tracked. Ids the pool no longer carries are left in place rather than
    /// removed — a discarded credential's history stays addressable (e.g. a
    /// reload that re-adds the same secret later) instead of being deleted
    /// the moment its pool slot disappears.
    pub fn sync_credentials(&self, ids: &[CredentialId]) {
        let mut credentials = self.credentials.write();
        for id in ids {
            credentials.ensure(*id);
        }
    }

    pub fn record_attempt(&self, credential_id: CredentialId, latency_ms: f64, error_code: Option<&'static str>, is_429: bool) {
        let recorded = self.credentials.read().record(credential_id, latency_ms, error_code, is_429);
        if !recorded {
            self.credentials.write().ensure(credential_id);
            self.credentials.read().record(credential_id, latency_ms, error_code, is_429);
        }
        self.global.record_request(error_code.is_none());
    }

    /// Records a failed request that never reached a credential (`POOL_COLD`,
    /// admission rejection before selection) — global counters only, since
    /// there's no credential to attribute it to.
    pub fn record_failure_without_credential(&self) {
        self.global.record_request(false);
    }

    pub fn record_backpressure_rejection(&self) {
        self.global.record_backpressure_rejection();
    }

    pub fn record_queue_timeout(&self) {
        self.global.record_queue_timeout();
    }

    pub fn record_shutdown_aborted(&self) {
        self.global.record_shutdown_aborted();
    }

    pub fn record_cost(&self, amount_usd: f64) {
        self.cost.lock().record(amount_usd, Utc::now());
    }

    /// `ordered_ids` is the pool's current slot order (from
    /// `gateway_pool::Pool::credential_ids`); the server passes it in so
    /// `/stats` lists credentials the same way `/health` does without this
    /// crate reaching back into `gateway-pool` for it.
    pub fn stats_snapshot(&self, ordered_ids: &[CredentialId]) -> StatsSnapshot {
        let credentials = self.credentials.read();
        StatsSnapshot {
            global: self.global.snapshot(),
            credentials: credentials.snapshot_ordered(ordered_ids),
        }
    }

    pub fn cost_snapshot(&self) -> CostStatsSnapshot {
        self.cost.lock().snapshot(Utc::now())
    }

    fn persisted_state(&self) -> PersistedState {
        let credentials = self.credentials.read();
        PersistedState {
            global: self.global.snapshot(),
            credentials: credentials.persisted(),
            cost: self.cost.lock().to_persisted(),
        }
    }

    /// Writes the current state to disk immediately. Used by the debounce
    /// task and by an admin-triggered flush / graceful shutdown.
    pub fn flush(&self) -> std::io::Result<()> {
        let Some(path) = self.snapshot_path.as_deref() else {
            return Ok(());
        };
        gateway_persistence::atomic_write(path, 1, &self.persisted_state())
    }
}

/// Spawns the debounced background writer. Dropping the returned handle
/// does not stop the task; callers hold it only to keep the runtime alive
/// in tests.
pub fn spawn_persistence_task(aggregator: Arc<StatsAggregator>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(_err) = aggregator.flush() {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_err, "failed to persist stats snapshot");
            }
        }
    })
}
