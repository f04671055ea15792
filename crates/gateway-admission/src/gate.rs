//! The admission gate: a concurrency ceiling backed by a FIFO wait queue
//! that is explicitly bounded and distinct from the ceiling itself.
//!
//! Adapted from `tower_resilience_bulkhead::service::Bulkhead`'s
//! `Semaphore`-backed permit acquisition, generalized with a queue-depth
//! counter the bulkhead never had: the bulkhead only ever waits on the
//! semaphore directly (indefinitely or with one timeout), so "the queue is
//! full" and "the ceiling is full" were the same rejection. Here they are
//! two distinct outcomes (`BACKPRESSURE` vs `QUEUE_TIMEOUT`), so a queue
//! depth counter gates entry to the wait *before* the semaphore is touched.

use crate::drain::DrainRateTracker;
use crate::error::AdmissionError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    pub max_total_concurrency: usize,
    pub queue_size: usize,
    pub queue_timeout: Duration,
    pub max_body_size: usize,
}

/// Holds the request's concurrency slot; dropping it (on any exit path,
/// including the caller's future being cancelled) frees the slot for the
/// next waiter.
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionSnapshot {
    pub current: usize,
    pub max: usize,
    pub available: usize,
    pub queue_current: usize,
    pub queue_max: usize,
    pub enqueued_total: u64,
    pub timed_out_total: u64,
}

/// RAII wait-queue slot: increments `queue_current` on construction,
/// decrements it on drop regardless of how the holding future exits — this
/// is what makes queue-depth accounting correct under client cancellation.
struct QueueSlot {
    queue_current: Arc<AtomicUsize>,
}

impl QueueSlot {
    fn try_acquire(queue_current: &Arc<AtomicUsize>, limit: usize) -> Option<Self> {
        loop {
            let current = queue_current.load(Ordering::Acquire);
            if current >= limit {
                return None;
            }
            if queue_current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(Self {
                    queue_current: Arc::clone(queue_current),
                });
            }
        }
    }
}

impl Drop for QueueSlot {
    fn drop(&mut self) {
        self.queue_current.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    config: AdmissionConfig,
    queue_current: Arc<AtomicUsize>,
    enqueued_total: AtomicU64,
    timed_out_total: AtomicU64,
    drain: Mutex<DrainRateTracker>,
}

impl AdmissionGate {
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_total_concurrency)),
            queue_current: Arc::new(AtomicUsize::new(0)),
            enqueued_total: AtomicU64::new(0),
            timed_out_total: AtomicU64::new(0),
            drain: Mutex::new(DrainRateTracker::new(Duration::from_secs(10))),
            config,
        }
    }

    pub fn check_body_size(&self, size: usize) -> Result<(), AdmissionError> {
        if size > self.config.max_body_size {
            return Err(AdmissionError::RequestTooLarge {
                size,
                limit: self.config.max_body_size,
            });
        }
        Ok(())
    }

    /// Acquires a concurrency slot, enqueueing (FIFO, via the semaphore's own
    /// waiter order) if the ceiling is currently full.
    pub async fn acquire(&self) -> Result<AdmissionPermit, AdmissionError> {
        if let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() {
            return Ok(AdmissionPermit { _permit: permit });
        }

        let _slot = match QueueSlot::try_acquire(&self.queue_current, self.config.queue_size) {
            Some(slot) => slot,
            None => {
                return Err(AdmissionError::Backpressure {
                    retry_after_ms: self.retry_after_hint(),
                })
            }
        };
        self.enqueued_total.fetch_add(1, Ordering::Relaxed);

        let semaphore = Arc::clone(&self.semaphore);
        match tokio::time::timeout(self.config.queue_timeout, semaphore.acquire_owned()).await {
            Ok(Ok(permit)) => Ok(AdmissionPermit { _permit: permit }),
            Ok(Err(_)) => Err(AdmissionError::Backpressure {
                retry_after_ms: self.retry_after_hint(),
            }),
            Err(_) => {
                self.timed_out_total.fetch_add(1, Ordering::Relaxed);
                Err(AdmissionError::QueueTimeout)
            }
        }
    }

    /// Call once a request that held a permit has finished, to keep the
    /// drain-rate estimate (and thus the `BACKPRESSURE` hint) current.
    pub fn record_completion(&self) {
        self.drain.lock().record(Instant::now());
    }

    fn retry_after_hint(&self) -> u64 {
        let queue_depth = self.queue_current.load(Ordering::Relaxed).max(1) as f64;
        let rate = self.drain.lock().rate_per_second();
        if rate <= 0.0 {
            return 1000;
        }
        ((queue_depth / rate) * 1000.0).ceil() as u64
    }

    pub fn snapshot(&self) -> AdmissionSnapshot {
        AdmissionSnapshot {
            current: self.config.max_total_concurrency - self.semaphore.available_permits(),
            max: self.config.max_total_concurrency,
            available: self.semaphore.available_permits(),
            queue_current: self.queue_current.load(Ordering::Relaxed),
            queue_max: self.config.queue_size,
            enqueued_total: self.enqueued_total.load(Ordering::Relaxed),
            timed_out_total: self.timed_out_total.load(Ordering::Relaxed),
        }
    }
}
