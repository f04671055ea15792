//! Backoff and retry-budget primitives shared by the credential pool's
//! cooldown calculation and the forwarder's inter-attempt delay.
//!
//! Unlike the teacher's retry middleware, this crate does not wrap a
//! `tower::Service` — the forwarder drives attempts itself (it needs per-
//! attempt credential selection, not a blind "call the same inner service
//! again"), so only the building blocks are exposed: [`backoff`] for delay
//! calculation and [`budget`] for capping how many retries a request gets.

pub mod backoff;
pub mod budget;
pub mod events;

pub use backoff::{ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, IntervalFunction};
pub use budget::{AimdBudget, RetryBudget, RetryBudgetBuilder, TokenBucketBudget};
pub use events::RetryEvent;
