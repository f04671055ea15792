//! In-memory time-series sampler backing `GET /history?minutes=N`.
//!
//! No crate downstream of the stats aggregator keeps a series — `gateway-stats`
//! only ever hands back point-in-time snapshots (see its own doc comment on
//! why it never reaches into its callers). This samples those snapshots on a
//! fixed tick, the same `tokio::time::interval` shape
//! `gateway_stats::spawn_persistence_task` already uses for its debounce, and
//! keeps the raw series in a `gateway_core::RingBuffer` so long queries fall
//! back to a coarser resolution instead of returning an unbounded response.

use chrono::{DateTime, Utc};
use gateway_core::RingBuffer;
use gateway_stats::GlobalCountersSnapshot;
use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;

/// 12 hours of raw samples at the default 10s tick.
const CAPACITY: usize = 4320;

#[derive(Debug, Clone, Copy)]
struct HistoryPoint {
    ts: DateTime<Utc>,
    total_requests: u64,
    total_successes: u64,
    total_failures: u64,
    cost_usd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Raw,
    Medium,
    Low,
}

impl Resolution {
    fn name(self) -> &'static str {
        match self {
            Resolution::Raw => "raw",
            Resolution::Medium => "medium",
            Resolution::Low => "low",
        }
    }

    fn downsample_factor(self) -> u64 {
        match self {
            Resolution::Raw => 1,
            Resolution::Medium => 6,
            Resolution::Low => 30,
        }
    }
}

fn resolution_for(minutes: u64) -> Resolution {
    if minutes <= 60 {
        Resolution::Raw
    } else if minutes <= 360 {
        Resolution::Medium
    } else {
        Resolution::Low
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPointWire {
    pub ts: DateTime<Utc>,
    pub total_requests: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub tier: &'static str,
    pub tier_resolution: u64,
    pub expected_interval: u64,
    pub expected_point_count: u64,
    pub actual_point_count: u64,
    pub data_age_ms: u64,
    pub schema_version: u32,
    pub points: Vec<HistoryPointWire>,
}

pub struct HistoryTracker {
    samples: Mutex<RingBuffer<HistoryPoint>>,
    interval: Duration,
}

impl HistoryTracker {
    pub fn new(interval: Duration) -> Self {
        Self {
            samples: Mutex::new(RingBuffer::new(CAPACITY)),
            interval,
        }
    }

    pub fn record(&self, global: &GlobalCountersSnapshot, cost_usd: f64) {
        self.samples.lock().push(HistoryPoint {
            ts: Utc::now(),
            total_requests: global.total_requests,
            total_successes: global.total_successes,
            total_failures: global.total_failures,
            cost_usd,
        });
    }

    pub fn query(&self, minutes: u64) -> HistoryResponse {
        let minutes = minutes.max(1);
        let resolution = resolution_for(minutes);
        let factor = resolution.downsample_factor();
        let expected_interval = self.interval.as_millis() as u64 * factor;
        let expected_point_count = ((minutes * 60_000) / expected_interval.max(1)).max(1);

        let samples = self.samples.lock();
        let now = Utc::now();
        let cutoff = now - chrono::Duration::minutes(minutes as i64);

        let points: Vec<HistoryPointWire> = samples
            .iter()
            .filter(|p| p.ts >= cutoff)
            .step_by(factor as usize)
            .map(|p| HistoryPointWire {
                ts: p.ts,
                total_requests: p.total_requests,
                total_successes: p.total_successes,
                total_failures: p.total_failures,
                cost_usd: p.cost_usd,
            })
            .collect();

        let data_age_ms = samples
            .iter()
            .last()
            .map(|p| (now - p.ts).num_milliseconds().max(0) as u64)
            .unwrap_or(0);

        HistoryResponse {
            tier: resolution.name(),
            tier_resolution: expected_interval,
            expected_interval,
            expected_point_count,
            actual_point_count: points.len() as u64,
            data_age_ms,
            schema_version: 2,
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_fresh_tracker_reports_zero_points_and_zero_age() {
        let tracker = HistoryTracker::new(Duration::from_secs(10));
        let response = tracker.query(15);
        assert_eq!(response.actual_point_count, 0);
        assert_eq!(response.data_age_ms, 0);
        assert_eq!(response.schema_version, 2);
    }

    #[test]
    fn a_recorded_sample_is_visible_in_the_raw_tier() {
        let tracker = HistoryTracker::new(Duration::from_secs(10));
        tracker.record(
            &GlobalCountersSnapshot { total_requests: 3, ..Default::default() },
            1.5,
        );
        let response = tracker.query(5);
        assert_eq!(response.tier, "raw");
        assert_eq!(response.actual_point_count, 1);
        assert_eq!(response.points[0].total_requests, 3);
    }

    #[test]
    fn long_windows_pick_a_coarser_tier() {
        let tracker = HistoryTracker::new(Duration::from_secs(10));
        let response = tracker.query(500);
        assert_eq!(response.tier, "low");
        assert_eq!(response.expected_interval, 300_000);
    }
}
