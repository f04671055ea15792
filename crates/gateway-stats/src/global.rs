//! Global sums: a single atomic-counter coordinator, never contended by
//! per-credential mutexes — spec §4.5's "lock-free or single coordinator for
//! global sums."

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct GlobalCounters {
    pub total_requests: AtomicU64,
    pub total_successes: AtomicU64,
    pub total_failures: AtomicU64,
    pub backpressure_rejections: AtomicU64,
    pub queue_timeouts: AtomicU64,
    pub shutdown_aborted: AtomicU64,
}

impl GlobalCounters {
    /// Rebuilds the atomics from a persisted snapshot, used when restoring
    /// from disk on startup.
    pub fn restore(snapshot: GlobalCountersSnapshot) -> Self {
        Self {
            total_requests: AtomicU64::new(snapshot.total_requests),
            total_successes: AtomicU64::new(snapshot.total_successes),
            total_failures: AtomicU64::new(snapshot.total_failures),
            backpressure_rejections: AtomicU64::new(snapshot.backpressure_rejections),
            queue_timeouts: AtomicU64::new(snapshot.queue_timeouts),
            shutdown_aborted: AtomicU64::new(snapshot.shutdown_aborted),
        }
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.total_successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_backpressure_rejection(&self) {
        self.backpressure_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queue_timeout(&self) {
        self.queue_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_shutdown_aborted(&self) {
        self.shutdown_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> GlobalCountersSnapshot {
        GlobalCountersSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_successes: self.total_successes.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            backpressure_rejections: self.backpressure_rejections.load(Ordering::Relaxed),
            queue_timeouts: self.queue_timeouts.load(Ordering::Relaxed),
            shutdown_aborted: self.shutdown_aborted.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalCountersSnapshot {
    pub total_requests: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub backpressure_rejections: u64,
    pub queue_timeouts: u64,
    pub shutdown_aborted: u64,
}
