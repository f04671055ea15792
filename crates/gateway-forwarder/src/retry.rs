//! Retry orchestration across credentials.
//!
//! One request may span several attempts, each against a different
//! credential drawn from the pool. This module owns only the bookkeeping —
//! how many attempts have been made, whether the budget allows another, and
//! how long to wait before the next one — not the network I/O itself, which
//! lives in [`crate::forwarder`].

use gateway_credential::CredentialId;
use gateway_retry::{ExponentialRandomBackoff, IntervalFunction, RetryBudget};
use std::sync::Arc;
use std::time::Duration;

/// One completed attempt, recorded on the request envelope's `attempts`
/// field. `credential_id` is the stable identity stats are keyed
/// by; `key_index` is the pool position at the moment of the attempt, kept
/// only for display (event bus, traces) where a stale position after a
/// later reindex is cosmetic, not a correctness issue.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub key_index: usize,
    pub credential_id: CredentialId,
    pub status_code: Option<u16>,
    pub latency_ms: f64,
    pub error_kind: Option<&'static str>,
}

/// Whether the forwarder should make another attempt after this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { after: RetryDelay },
    GiveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDelay(pub Duration);

/// Tracks attempt count and consults the shared retry budget and backoff
/// schedule to decide whether another attempt is warranted.
pub struct RetryPolicy {
    budget: Arc<dyn RetryBudget>,
    backoff: ExponentialRandomBackoff,
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(budget: Arc<dyn RetryBudget>, backoff: ExponentialRandomBackoff, max_attempts: u32) -> Self {
        Self {
            budget,
            backoff,
            max_attempts,
        }
    }

    /// `attempt` is the 1-indexed count of attempts made so far (including
    /// the one that just failed). `retriable` comes from the classifier;
    /// `replayable` is false once the body exceeded `storeBodySizeLimit` or
    /// the response has already streamed a first byte to the client.
    pub fn decide(&self, attempt: u32, retriable: bool, replayable: bool) -> RetryDecision {
        if !retriable || !replayable {
            return RetryDecision::GiveUp;
        }
        if attempt >= self.max_attempts {
            return RetryDecision::GiveUp;
        }
        if !self.budget.try_withdraw() {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry {
            after: RetryDelay(self.backoff.interval(attempt)),
        }
    }

    pub fn record_success(&self) {
        self.budget.deposit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_retry::RetryBudgetBuilder;

    fn policy(max_attempts: u32) -> RetryPolicy {
        let budget = RetryBudgetBuilder::new()
            .token_bucket()
            .max_tokens(10)
            .initial_tokens(10)
            .build();
        let backoff = ExponentialRandomBackoff::new(Duration::from_millis(50), 0.2);
        RetryPolicy::new(budget, backoff, max_attempts)
    }

    #[test]
    fn non_retriable_outcome_always_gives_up() {
        let p = policy(5);
        assert_eq!(p.decide(1, false, true), RetryDecision::GiveUp);
    }

    #[test]
    fn non_replayable_body_gives_up_even_if_retriable() {
        let p = policy(5);
        assert_eq!(p.decide(1, true, false), RetryDecision::GiveUp);
    }

    #[test]
    fn stops_once_max_attempts_reached() {
        let p = policy(2);
        assert!(matches!(p.decide(1, true, true), RetryDecision::Retry { .. }));
        assert_eq!(p.decide(2, true, true), RetryDecision::GiveUp);
    }

    #[test]
    fn exhausted_budget_gives_up() {
        let budget = RetryBudgetBuilder::new()
            .token_bucket()
            .max_tokens(1)
            .initial_tokens(1)
            .build();
        let backoff = ExponentialRandomBackoff::new(Duration::from_millis(10), 0.0);
        let p = RetryPolicy::new(budget, backoff, 10);
        assert!(matches!(p.decide(1, true, true), RetryDecision::Retry { .. }));
        assert_eq!(p.decide(2, true, true), RetryDecision::GiveUp);
    }
}
