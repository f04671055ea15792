//! Per-credential counters: one `parking_lot::Mutex`-guarded record per
//! credential, matching the teacher's per-pattern `parking_lot` usage
//! (`tower_resilience_bulkhead`'s semaphore-adjacent bookkeeping) rather than
//! a single global lock serialising every credential's updates against each
//! other.
//!
//! Keyed by [`CredentialId`] rather than pool position: a hot-reload removal
//! discards a credential's pool slot and shifts every later slot's index
//! down (`gateway_pool::Pool::reindex`), and a position-keyed map would
//! silently hand the shifted-in credential the discarded one's history. An
//! id derived from the secret itself survives that shift unaffected.

use gateway_core::RingBuffer;
use gateway_credential::CredentialId;
use parking_lot::Mutex;
use std::collections::HashMap;

/// One credential's hot-path counters, serialised by its own mutex so
/// updates to different credentials never contend.
#[derive(Debug, Default)]
pub struct CredentialCounters {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub upstream_429: u64,
    /// Count per taxonomy code (`UPSTREAM_5XX`, `UPSTREAM_TIMEOUT`, ...).
    pub error_taxonomy: HashMap<String, u64>,
    latencies: Option<RingBuffer<f64>>,
}

impl CredentialCounters {
    fn latency_window(window: usize) -> RingBuffer<f64> {
        RingBuffer::new(window.max(1))
    }

    pub fn record(&mut self, latency_ms: f64, error_kind: Option<&'static str>, is_429: bool, latency_window: usize) {
        self.requests += 1;
        if error_kind.is_none() {
            self.successes += 1;
        } else {
            self.failures += 1;
            if is_429 {
                self.upstream_429 += 1;
            }
            if let Some(code) = error_kind {
                *self.error_taxonomy.entry(code.to_string()).or_insert(0) += 1;
            }
        }
        self.latencies
            .get_or_insert_with(|| Self::latency_window(latency_window))
            .push(latency_ms);
    }

    pub fn p50(&self) -> Option<f64> {
        self.latencies.as_ref().and_then(|l| l.p50())
    }

    pub fn p95(&self) -> Option<f64> {
        self.latencies.as_ref().and_then(|l| l.p95())
    }

    pub fn p99(&self) -> Option<f64> {
        self.latencies.as_ref().and_then(|l| l.p99())
    }
}

/// One mutex per credential, keyed by the credential's stable identity
/// rather than its pool position.
pub struct PerCredentialCounters {
    by_id: HashMap<CredentialId, Mutex<CredentialCounters>>,
    latency_window: usize,
}

impl PerCredentialCounters {
    pub fn new(ids: &[CredentialId], latency_window: usize) -> Self {
        let by_id = ids
            .iter()
            .map(|id| (*id, Mutex::new(CredentialCounters::default())))
            .collect();
        Self { by_id, latency_window }
    }

    /// Adds a zeroed entry for `id` if one doesn't already exist — a no-op
    /// for a credential that was already seen (e.g. unchanged across a
    /// reload, or the first `record` for it already created it).
    pub fn ensure(&mut self, id: CredentialId) {
        self.by_id.entry(id).or_insert_with(|| Mutex::new(CredentialCounters::default()));
    }

    /// Rebuilds from a persisted snapshot, used when restoring from disk on
    /// startup. Credentials in the current pool that weren't in the
    /// snapshot (added since it was taken) are added separately via
    /// [`Self::ensure`].
    pub fn restore(snapshots: Vec<CredentialCountersSnapshot>, latency_window: usize) -> Self {
        let by_id = snapshots
            .into_iter()
            .map(|snap| {
                let id = CredentialId(snap.id);
                let c = CredentialCounters {
                    requests: snap.requests,
                    successes: snap.successes,
                    failures: snap.failures,
                    upstream_429: snap.upstream_429,
                    error_taxonomy: snap.error_taxonomy,
                    latencies: None,
                };
                (id, Mutex::new(c))
            })
            .collect();
        Self { by_id, latency_window }
    }

    /// Records an attempt against `id`, auto-vivifying a zeroed entry on
    /// first use — a credential added by a hot-reload only gets counters
    /// the moment it actually serves a request, not at reload time.
    pub fn record(&self, id: CredentialId, latency_ms: f64, error_kind: Option<&'static str>, is_429: bool) -> bool {
        if let Some(slot) = self.by_id.get(&id) {
            slot.lock().record(latency_ms, error_kind, is_429, self.latency_window);
            true
        } else {
            false
        }
    }

    pub fn snapshot(&self, id: CredentialId) -> Option<CredentialCountersSnapshot> {
        self.by_id.get(&id).map(|slot| {
            let c = slot.lock();
            CredentialCountersSnapshot {
                id: id.0,
                requests: c.requests,
                successes: c.successes,
                failures: c.failures,
                upstream_429: c.upstream_429,
                error_taxonomy: c.error_taxonomy.clone(),
                p50: c.p50(),
                p95: c.p95(),
                p99: c.p99(),
            }
        })
    }

    /// Snapshots every tracked credential, in the order its id appears in
    /// `ids` — the caller passes the pool's current slot order so `/stats`
    /// lists credentials the same way `/health` does, without this crate
    /// ever reaching back into `gateway-pool` itself.
    pub fn snapshot_ordered(&self, ids: &[CredentialId]) -> Vec<CredentialCountersSnapshot> {
        ids.iter()
            .map(|id| self.snapshot(*id).unwrap_or(CredentialCountersSnapshot { id: id.0, ..Default::default() }))
            .collect()
    }

    pub fn persisted(&self) -> Vec<CredentialCountersSnapshot> {
        self.by_id
            .keys()
            .filter_map(|id| self.snapshot(*id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialCountersSnapshot {
    pub id: u64,
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub upstream_429: u64,
    pub error_taxonomy: HashMap<String, u64>,
    pub p50: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> CredentialId {
        CredentialId(n)
    }

    #[test]
    fn records_success_and_failure_separately() {
        let counters = PerCredentialCounters::new(&[id(1)], 16);
        counters.record(id(1), 10.0, None, false);
        counters.record(id(1), 20.0, Some("UPSTREAM_5XX"), false);
        let snap = counters.snapshot(id(1)).unwrap();
        assert_eq!(snap.requests, 2);
        assert_eq!(snap.successes, 1);
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.error_taxonomy.get("UPSTREAM_5XX"), Some(&1));
    }

    #[test]
    fn tracks_429s_within_failures() {
        let counters = PerCredentialCounters::new(&[id(1)], 16);
        counters.record(id(1), 5.0, Some("UPSTREAM_429"), true);
        let snap = counters.snapshot(id(1)).unwrap();
        assert_eq!(snap.upstream_429, 1);
        assert_eq!(snap.failures, 1);
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let counters = PerCredentialCounters::new(&[id(1)], 16);
        assert!(!counters.record(id(99), 1.0, None, false));
        assert_eq!(counters.snapshot(id(1)).unwrap().requests, 0);
    }

    #[test]
    fn survives_a_reindex_because_it_never_indexes_by_position() {
        // Three credentials; the middle one (id 2) drains and is discarded,
        // which in `gateway-pool` shifts id 3's pool index from 2 down to 1.
        // A position-keyed map would now hand id 3 id 2's history; this one
        // can't, because it never had a position to begin with.
        let counters = PerCredentialCounters::new(&[id(1), id(2), id(3)], 16);
        counters.record(id(2), 50.0, Some("UPSTREAM_5XX"), false);
        counters.record(id(3), 10.0, None, false);

        // id(2)'s slot is discarded; id(3) keeps its own counters regardless
        // of whatever pool index it now occupies.
        let snap3 = counters.snapshot(id(3)).unwrap();
        assert_eq!(snap3.requests, 1);
        assert_eq!(snap3.failures, 0);
    }

    #[test]
    fn ensure_is_idempotent() {
        let mut counters = PerCredentialCounters::new(&[], 16);
        counters.ensure(id(1));
        counters.ensure(id(1));
        assert_eq!(counters.len(), 1);
    }
}
