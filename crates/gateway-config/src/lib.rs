//! Typed configuration (spec §4.9/§6): the recognised option set, a layered
//! defaults → file → environment → CLI loader, the credential-file parser,
//! and the `notify`-based hot-reload watch loop for the credential file and
//! routing table.

pub mod cli;
pub mod credentials;
pub mod loader;
pub mod schema;
pub mod watch;

pub use cli::Cli;
pub use credentials::{load as load_credentials, LoadedCredentials};
pub use loader::load;
pub use schema::{
    AdminAuthConfig, ConcurrencyConfig, CredentialsConfig, CspConfig, GatewayConfig, LoggingConfig,
    PersistenceConfig, PoolTuning, RetryConfig, SecurityConfig, SecurityMode, TelemetryConfig,
    UpstreamConfig,
};
pub use watch::{spawn_watch, WatchEvent, WatchHandle, WatchedFile};
