//! Shared harness for the end-to-end scenarios: wires the same set of
//! component crates `gateway-server`'s `main.rs` does, but against a
//! temp-directory config and without binding a real listener — handlers are
//! exercised in-process with `tower::ServiceExt::oneshot`, matching how the
//! teacher's own HTTP-adjacent examples drive an `axum::Router` under test.

use gateway_admission::AdmissionGate;
use gateway_config::GatewayConfig;
use gateway_events::EventBus;
use gateway_forwarder::retry::RetryPolicy;
use gateway_forwarder::routing::ModelRouter;
use gateway_forwarder::timeout::AttemptDeadlines;
use gateway_forwarder::{Forwarder, ForwarderConfig};
use gateway_pool::{new_credential, Pool, SelectionStrategy};
use gateway_retry::RetryBudgetBuilder;
use gateway_routing::TableRouter;
use gateway_server::cost_model::CostModel;
use gateway_server::history::HistoryTracker;
use gateway_server::logs::LogRing;
use gateway_server::{routes, AppState};
use gateway_stats::{CostBudget, StatsAggregator, StatsAggregatorConfig};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub struct Harness {
    pub app: axum::Router,
    pub state: Arc<AppState>,
    _dir: tempfile::TempDir,
}

/// Knobs a scenario needs to tweak; everything else takes the schema's own
/// defaults the way a freshly started gateway would.
pub struct HarnessConfig {
    pub keys: Vec<&'static str>,
    pub upstream_base_url: String,
    pub max_total_concurrency: usize,
    pub queue_size: usize,
    pub max_body_size: usize,
    pub retry_budget: usize,
    pub failure_rate_threshold: f64,
    pub circuit_window_ms: u64,
    pub cooldown_base_ms: u64,
}

impl HarnessConfig {
    pub fn new(upstream_base_url: impl Into<String>) -> Self {
        Self {
            keys: vec!["sk-test-1"],
            upstream_base_url: upstream_base_url.into(),
            max_total_concurrency: 64,
            queue_size: 256,
            max_body_size: 2 * 1024 * 1024,
            retry_budget: 32,
            failure_rate_threshold: 0.5,
            circuit_window_ms: 30_000,
            cooldown_base_ms: 500,
        }
    }
}

pub async fn build(cfg: HarnessConfig) -> Harness {
    let dir = tempfile::tempdir().unwrap();

    let keys_json = serde_json::json!({ "keys": cfg.keys }).to_string();
    std::fs::write(dir.path().join("keys.json"), keys_json).unwrap();
    std::fs::write(
        dir.path().join("routing.json"),
        r#"{"schemaVersion":2,"tiers":{},"classifier":{}}"#,
    )
    .unwrap();

    let mut config = GatewayConfig::default();
    config.credentials.config_dir = dir.path().to_path_buf();
    config.upstream.base_url = Some(cfg.upstream_base_url);
    config.concurrency.max_total_concurrency = cfg.max_total_concurrency;
    config.concurrency.queue_size = cfg.queue_size;
    config.concurrency.max_body_size = cfg.max_body_size;
    config.retries.retry_budget = cfg.retry_budget;
    config.pool.failure_rate_threshold = cfg.failure_rate_threshold;
    config.pool.circuit_window_ms = cfg.circuit_window_ms;
    config.pool.cooldown_base_ms = cfg.cooldown_base_ms;
    config.persistence.stats_file = dir.path().join("stats.json");
    config.persistence.routing_file = dir.path().join("routing.json");

    let credentials_path = config.credentials.keys_file_path();
    let routing_path = config.persistence.routing_file.clone();

    let loaded_credentials =
        gateway_config::load_credentials(&credentials_path, &config.pool).expect("load credentials");

    let mut pool = Pool::new(SelectionStrategy::Balanced, config.pool.pool_config());
    for (index, spec) in loaded_credentials.specs.iter().enumerate() {
        pool.push(new_credential(
            index,
            spec.secret.clone(),
            spec.max_concurrency,
            spec.bucket_capacity,
            spec.bucket_burst,
            spec.bucket_refill_per_second,
            config.telemetry.latency_window,
        ));
    }
    let initial_credential_ids = pool.credential_ids();
    let pool = Arc::new(Mutex::new(pool));

    let loaded_routing = gateway_routing::load(&routing_path).expect("load routing");
    let router = Arc::new(TableRouter::new(loaded_routing.config));

    let stats = Arc::new(StatsAggregator::new(
        &initial_credential_ids,
        StatsAggregatorConfig {
            snapshot_path: Some(config.persistence.stats_file.clone()),
            flush_interval: config.persistence.stats_flush_interval(),
            latency_window: config.telemetry.latency_window,
            cost_budget: CostBudget::default(),
        },
    ));

    let events = Arc::new(EventBus::new(config.telemetry.event_capacity, config.telemetry.replay_size.max(200)));
    let admission = Arc::new(AdmissionGate::new(config.admission_config()));

    let retry_budget = RetryBudgetBuilder::new()
        .token_bucket()
        .max_tokens(config.retries.retry_budget)
        .build();
    let retry_policy = RetryPolicy::new(retry_budget, config.retries.backoff(), config.retries.retry_budget as u32);

    let http_client = reqwest::Client::builder().build().unwrap();
    let forwarder = Arc::new(Forwarder::new(
        http_client,
        ForwarderConfig {
            upstream_base_url: config.upstream.base_url.clone().unwrap(),
            deadlines: AttemptDeadlines {
                idle_read_timeout: Duration::from_secs(5),
                total_deadline: Duration::from_secs(10),
            },
            store_body_size_limit: config.concurrency.store_body_size_limit,
        },
        Arc::clone(&pool),
        Arc::clone(&router) as Arc<dyn ModelRouter>,
        retry_policy,
    ));

    let history = Arc::new(HistoryTracker::new(Duration::from_secs(10)));

    let state = Arc::new(AppState {
        config,
        pool,
        admission,
        forwarder,
        stats,
        events,
        router,
        history,
        cost_model: CostModel::default(),
        logs: Arc::new(LogRing::new(200)),
        paused: AtomicBool::new(false),
        started_at: Instant::now(),
        credentials_path,
        routing_path,
    });

    let app = routes::build(Arc::clone(&state));

    Harness { app, state, _dir: dir }
}
