//! Hot-reload diffing for the credential file.
//!
//! File-watching itself (`notify`) lives in `gateway-config`, which owns the
//! debounced watch loop shared by the credential file and the routing table;
//! this module is the pure diff/apply step `gateway-config` calls into,
//! kept separate so it can be unit tested without a filesystem.

use crate::pool::{new_credential_with_priority, Pool};

/// One entry from a freshly loaded credential file.
#[derive(Debug, Clone)]
pub struct CredentialSpec {
    pub secret: String,
    pub max_concurrency: u32,
    pub bucket_capacity: f64,
    pub bucket_burst: f64,
    pub bucket_refill_per_second: f64,
    pub priority: u32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReloadSummary {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

/// Applies a new credential set to `pool` in place: unchanged-by-secret
/// credentials keep their runtime state, removed ones are marked draining
/// (discarded once idle, see [`Pool::mark_draining`]), added ones start
/// `CLOSED`. All-or-nothing: a malformed `new_set` (checked by the caller
/// before this is invoked) never leaves the pool half-migrated.
pub fn apply_reload(pool: &mut Pool, new_set: &[CredentialSpec], latency_window: usize) -> ReloadSummary {
    let mut summary = ReloadSummary::default();

    let still_present: Vec<bool> = pool
        .slots()
        .iter()
        .map(|slot| {
            new_set
                .iter()
                .any(|spec| spec.secret == slot.credential.secret())
        })
        .collect();

    for (i, present) in still_present.iter().enumerate() {
        if *present {
            summary.unchanged += 1;
        } else {
            pool.mark_draining(i);
            summary.removed += 1;
        }
    }

    let existing_secrets: Vec<String> = pool
        .slots()
        .iter()
        .map(|slot| slot.credential.secret().to_string())
        .collect();

    for spec in new_set {
        if !existing_secrets.iter().any(|s| s == &spec.secret) {
            let index = pool.len();
            pool.push(new_credential_with_priority(
                index,
                spec.secret.clone(),
                spec.max_concurrency,
                spec.bucket_capacity,
                spec.bucket_burst,
                spec.bucket_refill_per_second,
                latency_window,
                spec.priority,
            ));
            summary.added += 1;
        }
    }

    summary
}
