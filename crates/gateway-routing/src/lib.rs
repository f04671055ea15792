//! The model → tier routing table: v1→v2 config migration, change-detection
//! hashing, and the live router the forwarder resolves models through.

pub mod loader;
pub mod marker;
pub mod migrate;
pub mod router;
pub mod v1;
pub mod v2;

pub use loader::{load, LoadedRouting};
pub use marker::migration_marker;
pub use migrate::migrate_v1_to_v2;
pub use router::TableRouter;
pub use v1::{RoutingConfigV1, TierEntryV1};
pub use v2::{RoutingConfigV2, TierConfig};
