//! The three snapshot shapes spec §4.5 exposes over HTTP. These carry only
//! what `gateway-stats` itself knows (counters, latencies, cost); the server
//! merges in credential state and admission-gate numbers it gets from
//! `gateway-pool`/`gateway-admission` directly, since the stats aggregator is
//! write-only from those components and never reaches back into them.

use crate::cost::CostSnapshot;
use crate::counters::CredentialCountersSnapshot;
use crate::global::GlobalCountersSnapshot;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub current: usize,
    pub max: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub healthy_keys: usize,
    pub total_keys: usize,
    pub uptime_secs: u64,
    pub backpressure: BackpressureSnapshot,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackpressureSnapshot {
    pub queue: QueueSnapshot,
}

impl HealthSnapshot {
    pub fn new(healthy_keys: usize, total_keys: usize, uptime_secs: u64, queue: QueueSnapshot) -> Self {
        let status = if total_keys > 0 && healthy_keys == 0 {
            "DEGRADED"
        } else {
            "OK"
        };
        Self {
            status,
            healthy_keys,
            total_keys,
            uptime_secs,
            backpressure: BackpressureSnapshot { queue },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub global: GlobalCountersSnapshot,
    pub credentials: Vec<CredentialCountersSnapshot>,
}

pub use CostSnapshot as CostStatsSnapshot;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_is_degraded() {
        let snap = HealthSnapshot::new(0, 0, 0, QueueSnapshot { current: 0, max: 10 });
        assert_eq!(snap.status, "OK");
    }

    #[test]
    fn zero_healthy_among_some_total_is_degraded() {
        let snap = HealthSnapshot::new(0, 3, 0, QueueSnapshot { current: 0, max: 10 });
        assert_eq!(snap.status, "DEGRADED");
    }
}
