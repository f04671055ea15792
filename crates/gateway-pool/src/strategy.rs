//! Selection strategies for choosing among selectable credentials.
//!
//! The three strategies only differ in their tie-breaking order — the same
//! idea as `tower_resilience_healthcheck::selector::SelectionStrategy`'s
//! `FirstAvailable`/`RoundRobin`/`PreferHealthy`, but here every strategy
//! picks among the *already filtered* selectable set rather than scanning
//! raw health statuses, and the comparator is the whole point rather than
//! an afterthought.

use gateway_credential::Credential;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionStrategy {
    /// `(inFlight asc, healthScore desc, lastUsed asc, priority asc)`. The
    /// trailing `priority` only decides among credentials tied on the first
    /// three — grounded on `sujan174-Ai-Link`'s priority-tiered load
    /// balancer, but there it's the primary axis; here it's a tie-break.
    #[default]
    Balanced,
    /// `(healthScore desc, p95 asc)`.
    Quality,
    /// `(inFlight asc, throughputPerSecond desc)`.
    Throughput,
}

impl SelectionStrategy {
    /// Picks the best candidate index out of `selectable` (indices into
    /// `credentials`), ties broken deterministically by ascending index.
    pub fn pick(&self, selectable: &[usize], credentials: &[Credential]) -> Option<usize> {
        selectable
            .iter()
            .copied()
            .min_by(|&a, &b| self.compare(&credentials[a], &credentials[b]).then(a.cmp(&b)))
    }

    /// Same comparator as [`SelectionStrategy::pick`], but over a slice of
    /// references indexed by credential index rather than an owned slice —
    /// lets the pool pick without cloning its `Vec<Slot>`.
    pub fn pick_among(&self, selectable: &[usize], credentials: &[&Credential]) -> Option<usize> {
        selectable
            .iter()
            .copied()
            .min_by(|&a, &b| self.compare(credentials[a], credentials[b]).then(a.cmp(&b)))
    }

    fn compare(&self, a: &Credential, b: &Credential) -> Ordering {
        match self {
            SelectionStrategy::Balanced => a
                .in_flight()
                .cmp(&b.in_flight())
                .then_with(|| cmp_desc(a.health_score(), b.health_score()))
                .then_with(|| cmp_last_used_asc(a, b))
                .then_with(|| a.priority.cmp(&b.priority)),
            SelectionStrategy::Quality => cmp_desc(a.health_score(), b.health_score())
                .then_with(|| cmp_asc(a.p95().unwrap_or(0.0), b.p95().unwrap_or(0.0))),
            SelectionStrategy::Throughput => a.in_flight().cmp(&b.in_flight()).then_with(|| {
                cmp_desc(
                    a.throughput_per_second(60.0),
                    b.throughput_per_second(60.0),
                )
            }),
        }
    }
}

fn cmp_asc(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn cmp_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn cmp_last_used_asc(a: &Credential, b: &Credential) -> Ordering {
    match (a.last_used(), b.last_used()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y),
    }
}
