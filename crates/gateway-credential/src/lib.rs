//! Per-credential circuit breaking, rate limiting, and health scoring.
//!
//! Each upstream API key gets its own [`circuit::Circuit`] (failure-density
//! trip condition, exponential jittered cooldown), its own
//! `gateway_ratelimiter::TokenBucket`, and a rolling latency history, bundled
//! together as a [`credential::Credential`]. `gateway-pool` holds a `Vec` of
//! these and selects among them; this crate only knows about one credential
//! at a time.

pub mod circuit;
pub mod credential;
pub mod error;

pub use circuit::{Circuit, CircuitConfig, CircuitState};
pub use credential::{Counters, Credential, CredentialId};
pub use error::PoolError;
