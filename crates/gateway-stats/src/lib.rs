//! Request/cost/health counters for the gateway.
//!
//! Every other component only ever writes into this crate (a completed
//! attempt, a queue timeout, a dollar amount); it never reads back out of
//! `gateway-pool` or `gateway-admission` itself. The HTTP layer in
//! `gateway-server` merges this crate's snapshots with the credential and
//! admission state it already holds to build the final `/health` and
//! `/stats` bodies.

pub mod aggregator;
pub mod cost;
pub mod counters;
pub mod global;
pub mod snapshot;

pub use aggregator::{spawn_persistence_task, StatsAggregator, StatsAggregatorConfig};
pub use cost::{BudgetStatus, CostBudget, CostTracker, PersistedCost};
pub use counters::{CredentialCounters, CredentialCountersSnapshot, PerCredentialCounters};
pub use global::{GlobalCounters, GlobalCountersSnapshot};
pub use snapshot::{BackpressureSnapshot, CostStatsSnapshot, HealthSnapshot, QueueSnapshot, StatsSnapshot};
