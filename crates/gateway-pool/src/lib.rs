//! The credential pool: selects an upstream credential for each request,
//! tracks aggregate health, and owns the hot-reload contract for the
//! credential file.

pub mod pool;
pub mod reload;
pub mod strategy;

pub use pool::{new_credential, new_credential_with_priority, Pool, PoolConfig, SelectOutcome, Slot};
pub use reload::{apply_reload, CredentialSpec, ReloadSummary};
pub use strategy::SelectionStrategy;
