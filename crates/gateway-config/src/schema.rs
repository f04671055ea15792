//! The typed configuration surface (spec §6's "Configuration" section):
//! every recognised option, its default, and the conversions into the
//! runtime config structs each component crate already defines.
//!
//! Mirrors `agentreplay_server::config::ServerConfig`'s shape (nested
//! per-concern sections, `#[serde(default = "...")]` per field, a hand
//! written `Default` impl, a `validate()` pass) generalized to this
//! system's larger option set.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_config_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_keys_file() -> String {
    "keys.json".to_string()
}
fn default_true() -> bool {
    true
}
fn default_max_total_concurrency() -> usize {
    64
}
fn default_queue_size() -> usize {
    256
}
fn default_queue_timeout_ms() -> u64 {
    30_000
}
fn default_max_body_size() -> usize {
    2 * 1024 * 1024
}
fn default_store_body_size_limit() -> usize {
    256 * 1024
}
fn default_shutdown_timeout_ms() -> u64 {
    10_000
}
fn default_max_concurrency() -> u32 {
    8
}
fn default_requests_per_minute() -> f64 {
    60.0
}
fn default_burst() -> f64 {
    10.0
}
fn default_failure_rate_threshold() -> f64 {
    0.5
}
fn default_circuit_window_ms() -> u64 {
    30_000
}
fn default_cooldown_base_ms() -> u64 {
    500
}
fn default_cooldown_cap_ms() -> u64 {
    60_000
}
fn default_pool_429_window_ms() -> u64 {
    10_000
}
fn default_pool_429_rate_threshold() -> f64 {
    0.5
}
fn default_pool_429_cooldown_ms() -> u64 {
    5_000
}
fn default_retry_budget() -> usize {
    32
}
fn default_retry_base_ms() -> u64 {
    100
}
fn default_retry_cap_ms() -> u64 {
    5_000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_schema_version() -> u32 {
    1
}
fn default_heartbeat_interval_ms() -> u64 {
    15_000
}
fn default_replay_size() -> usize {
    50
}
fn default_event_capacity() -> usize {
    1024
}
fn default_mode() -> SecurityMode {
    SecurityMode::Local
}
fn default_admin_header_name() -> String {
    "x-admin-token".to_string()
}
fn default_stats_file() -> PathBuf {
    PathBuf::from("stats.json")
}
fn default_routing_file() -> PathBuf {
    PathBuf::from("routing.json")
}
fn default_stats_flush_interval_ms() -> u64 {
    10_000
}
fn default_latency_window() -> usize {
    256
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityMode {
    Local,
    Internet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsConfig {
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    #[serde(default = "default_keys_file")]
    pub keys_file: String,
    #[serde(default = "default_true")]
    pub enable_hot_reload: bool,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            keys_file: default_keys_file(),
            enable_hot_reload: true,
        }
    }
}

impl CredentialsConfig {
    pub fn keys_file_path(&self) -> PathBuf {
        self.config_dir.join(&self.keys_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcurrencyConfig {
    #[serde(default = "default_max_total_concurrency")]
    pub max_total_concurrency: usize,
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
    #[serde(default = "default_queue_timeout_ms")]
    pub queue_timeout_ms: u64,
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    #[serde(default = "default_store_body_size_limit")]
    pub store_body_size_limit: usize,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_total_concurrency: default_max_total_concurrency(),
            queue_size: default_queue_size(),
            queue_timeout_ms: default_queue_timeout_ms(),
            max_body_size: default_max_body_size(),
            store_body_size_limit: default_store_body_size_limit(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl ConcurrencyConfig {
    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolTuning {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: f64,
    #[serde(default = "default_burst")]
    pub burst: f64,
    #[serde(default = "default_failure_rate_threshold")]
    pub failure_rate_threshold: f64,
    #[serde(default = "default_circuit_window_ms")]
    pub circuit_window_ms: u64,
    #[serde(default = "default_cooldown_base_ms")]
    pub cooldown_base_ms: u64,
    #[serde(default = "default_cooldown_cap_ms")]
    pub cooldown_cap_ms: u64,
    #[serde(default = "default_pool_429_window_ms")]
    pub pool_429_window_ms: u64,
    #[serde(default = "default_pool_429_rate_threshold")]
    pub pool_429_rate_threshold: f64,
    #[serde(default = "default_pool_429_cooldown_ms")]
    pub pool_429_cooldown_ms: u64,
}

impl Default for PoolTuning {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            requests_per_minute: default_requests_per_minute(),
            burst: default_burst(),
            failure_rate_threshold: default_failure_rate_threshold(),
            circuit_window_ms: default_circuit_window_ms(),
            cooldown_base_ms: default_cooldown_base_ms(),
            cooldown_cap_ms: default_cooldown_cap_ms(),
            pool_429_window_ms: default_pool_429_window_ms(),
            pool_429_rate_threshold: default_pool_429_rate_threshold(),
            pool_429_cooldown_ms: default_pool_429_cooldown_ms(),
        }
    }
}

impl PoolTuning {
    /// Per-second refill rate a token bucket needs to sustain `requestsPerMinute`.
    pub fn refill_per_second(&self) -> f64 {
        self.requests_per_minute / 60.0
    }

    pub fn circuit_config(&self) -> gateway_credential::CircuitConfig {
        gateway_credential::CircuitConfig {
            failure_rate_threshold: self.failure_rate_threshold,
            window: Duration::from_millis(self.circuit_window_ms),
            cooldown_base: Duration::from_millis(self.cooldown_base_ms),
            cooldown_cap: Duration::from_millis(self.cooldown_cap_ms),
        }
    }

    pub fn pool_config(&self) -> gateway_pool::PoolConfig {
        gateway_pool::PoolConfig {
            circuit: self.circuit_config(),
            pool_429_window: Duration::from_millis(self.pool_429_window_ms),
            pool_429_rate_threshold: self.pool_429_rate_threshold,
            pool_429_cooldown: Duration::from_millis(self.pool_429_cooldown_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    #[serde(default = "default_retry_budget")]
    pub retry_budget: usize,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default = "default_retry_cap_ms")]
    pub retry_cap_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_budget: default_retry_budget(),
            retry_base_ms: default_retry_base_ms(),
            retry_cap_ms: default_retry_cap_ms(),
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> gateway_retry::ExponentialRandomBackoff {
        gateway_retry::ExponentialRandomBackoff::new(Duration::from_millis(self.retry_base_ms), 0.2)
            .with_max(Duration::from_millis(self.retry_cap_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_replay_size")]
    pub replay_size: usize,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default = "default_latency_window")]
    pub latency_window: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            schema_version: default_schema_version(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            replay_size: default_replay_size(),
            event_capacity: default_event_capacity(),
            latency_window: default_latency_window(),
        }
    }
}

impl TelemetryConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAuthConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default = "default_admin_header_name")]
    pub header_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CspConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default)]
    pub redact_bodies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
    #[serde(default = "default_mode")]
    pub mode: SecurityMode,
    #[serde(default)]
    pub admin_auth: AdminAuthConfig,
    #[serde(default)]
    pub csp: CspConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            admin_auth: AdminAuthConfig::default(),
            csp: CspConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceConfig {
    #[serde(default = "default_stats_file")]
    pub stats_file: PathBuf,
    #[serde(default = "default_routing_file")]
    pub routing_file: PathBuf,
    #[serde(default = "default_stats_flush_interval_ms")]
    pub stats_flush_interval_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            stats_file: default_stats_file(),
            routing_file: default_routing_file(),
            stats_flush_interval_ms: default_stats_flush_interval_ms(),
        }
    }
}

impl PersistenceConfig {
    pub fn stats_flush_interval(&self) -> Duration {
        Duration::from_millis(self.stats_flush_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamConfig {
    pub base_url: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self { base_url: None }
    }
}

/// The full recognised option set (spec §6), layered in from defaults, an
/// optional file, environment variables, and CLI flags by [`crate::loader`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default)]
    pub listen_addr: Option<String>,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    #[serde(default)]
    pub pool: PoolTuning,
    #[serde(default)]
    pub retries: RetryConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl GatewayConfig {
    /// Checked the same way `ServerConfig::validate` is: fail loudly on an
    /// operator mistake rather than starting in a half-working state.
    pub fn validate(&self) -> Result<(), String> {
        if self.security.admin_auth.enabled && self.security.admin_auth.tokens.is_empty() {
            return Err("security.adminAuth.enabled is true but no tokens are configured".into());
        }
        if self.concurrency.max_total_concurrency == 0 {
            return Err("concurrency.maxTotalConcurrency must be greater than zero".into());
        }
        if self.pool.max_concurrency == 0 {
            return Err("pool.maxConcurrency must be greater than zero".into());
        }
        if self.concurrency.store_body_size_limit > self.concurrency.max_body_size {
            return Err("concurrency.storeBodySizeLimit cannot exceed maxBodySize".into());
        }
        if self.security.mode == SecurityMode::Internet && !self.security.admin_auth.enabled {
            return Err(
                "security.mode is \"internet\" but security.adminAuth.enabled is false: \
                 an admin token is mandatory outside a trusted local network"
                    .into(),
            );
        }
        Ok(())
    }

    pub fn admission_config(&self) -> gateway_admission::AdmissionConfig {
        gateway_admission::AdmissionConfig {
            max_total_concurrency: self.concurrency.max_total_concurrency,
            queue_size: self.concurrency.queue_size,
            queue_timeout: self.concurrency.queue_timeout(),
            max_body_size: self.concurrency.max_body_size,
        }
    }
}
