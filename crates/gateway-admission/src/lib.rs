//! The admission gate: a global concurrency ceiling, a body-size check, and
//! a bounded FIFO wait queue with a per-request deadline, all in front of
//! the credential pool.

pub mod drain;
pub mod error;
pub mod gate;

pub use drain::DrainRateTracker;
pub use error::AdmissionError;
pub use gate::{AdmissionConfig, AdmissionGate, AdmissionPermit, AdmissionSnapshot};
