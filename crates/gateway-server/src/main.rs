//! Process entry point: parses flags, loads configuration, wires every
//! component crate into one [`gateway_server::AppState`], and serves it.

use anyhow::{Context, Result};
use clap::Parser;
use gateway_admission::AdmissionGate;
use gateway_events::EventBus;
use gateway_forwarder::timeout::AttemptDeadlines;
use gateway_forwarder::{Forwarder, ForwarderConfig};
use gateway_retry::RetryBudgetBuilder;
use gateway_routing::TableRouter;
use gateway_server::logs::{LogRing, LogRingLayer};
use gateway_server::{cost_model::CostModel, history::HistoryTracker, routes, AppState};
use gateway_stats::{spawn_persistence_task, StatsAggregator, StatsAggregatorConfig};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_RING_CAPACITY: usize = 2000;
/// Floor for the event bus's replay window: large enough that `/traces`
/// (which reuses `EventBus::recent`, see `routes::traces`) has a useful
/// scrollback even when `telemetry.replaySize` is tuned small for SSE
/// catch-up alone.
const MIN_EVENT_REPLAY_WINDOW: usize = 200;
const HISTORY_SAMPLE_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = gateway_config::Cli::parse();
    let config = gateway_config::load(cli.config.as_deref(), &cli)
        .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;

    let log_ring = Arc::new(LogRing::new(LOG_RING_CAPACITY));
    init_tracing(&config.telemetry.log_level, Arc::clone(&log_ring));

    if cli.dry_run {
        println!("configuration is valid");
        return Ok(());
    }

    let credentials_path = config.credentials.keys_file_path();
    let routing_path = config.persistence.routing_file.clone();

    let loaded_credentials = gateway_config::load_credentials(&credentials_path, &config.pool)
        .with_context(|| format!("loading credentials from {}", credentials_path.display()))?;

    let mut pool = gateway_pool::Pool::new(gateway_pool::SelectionStrategy::Balanced, config.pool.pool_config());
    for (index, spec) in loaded_credentials.specs.iter().enumerate() {
        pool.push(gateway_pool::new_credential_with_priority(
            index,
            spec.secret.clone(),
            spec.max_concurrency,
            spec.bucket_capacity,
            spec.bucket_burst,
            spec.bucket_refill_per_second,
            config.telemetry.latency_window,
            spec.priority,
        ));
    }
    let initial_credential_ids = pool.credential_ids();
    let pool = Arc::new(Mutex::new(pool));

    let loaded_routing = gateway_routing::load(&routing_path)
        .with_context(|| format!("loading routing table from {}", routing_path.display()))?;
    if loaded_routing.migrated_from_v1 {
        tracing::info!(path = %routing_path.display(), "migrated routing table from v1 to v2");
    }
    let router = Arc::new(TableRouter::new(loaded_routing.config));

    let stats = Arc::new(StatsAggregator::new(
        &initial_credential_ids,
        StatsAggregatorConfig {
            snapshot_path: Some(config.persistence.stats_file.clone()),
            flush_interval: config.persistence.stats_flush_interval(),
            latency_window: config.telemetry.latency_window,
            cost_budget: gateway_stats::CostBudget::default(),
        },
    ));
    let _persistence_task = spawn_persistence_task(Arc::clone(&stats), config.persistence.stats_flush_interval());

    let replay_window = config.telemetry.replay_size.max(MIN_EVENT_REPLAY_WINDOW);
    let events = Arc::new(EventBus::new(config.telemetry.event_capacity, replay_window));

    let admission = Arc::new(AdmissionGate::new(config.admission_config()));

    let upstream_base_url = config
        .upstream
        .base_url
        .clone()
        .or_else(|| loaded_credentials.base_url.clone())
        .context("no upstream base URL configured (set upstream.baseUrl or the credential file's baseUrl)")?;

    let retry_budget = RetryBudgetBuilder::new()
        .token_bucket()
        .max_tokens(config.retries.retry_budget)
        .build();
    let retry_policy = gateway_forwarder::retry::RetryPolicy::new(
        retry_budget,
        config.retries.backoff(),
        config.retries.retry_budget as u32,
    );

    let http_client = reqwest::Client::builder()
        .build()
        .context("building the upstream HTTP client")?;

    let forwarder = Arc::new(Forwarder::new(
        http_client,
        ForwarderConfig {
            upstream_base_url,
            deadlines: AttemptDeadlines {
                idle_read_timeout: Duration::from_secs(30),
                total_deadline: Duration::from_secs(120),
            },
            store_body_size_limit: config.concurrency.store_body_size_limit,
        },
        Arc::clone(&pool),
        Arc::clone(&router) as Arc<dyn gateway_forwarder::routing::ModelRouter>,
        retry_policy,
    ));

    let history = Arc::new(HistoryTracker::new(HISTORY_SAMPLE_INTERVAL));
    spawn_history_sampler(Arc::clone(&history), Arc::clone(&stats), HISTORY_SAMPLE_INTERVAL);

    let state = Arc::new(AppState {
        config: config.clone(),
        pool: Arc::clone(&pool),
        admission,
        forwarder,
        stats,
        events,
        router: Arc::clone(&router),
        history,
        cost_model: CostModel::default(),
        logs: log_ring,
        paused: AtomicBool::new(false),
        started_at: Instant::now(),
        credentials_path: credentials_path.clone(),
        routing_path: routing_path.clone(),
    });

    let _watch_handle = if config.credentials.enable_hot_reload {
        Some(spawn_reload_watcher(Arc::clone(&state), credentials_path, routing_path))
    } else {
        None
    };

    let app = routes::build(Arc::clone(&state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listen_addr = config.listen_addr.clone().unwrap_or_else(|| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("binding {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&state), config.concurrency.shutdown_timeout()))
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing(log_level: &str, log_ring: Arc<LogRing>) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(LogRingLayer::new(log_ring));
    registry.init();
}

fn spawn_history_sampler(
    history: Arc<HistoryTracker>,
    stats: Arc<StatsAggregator>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            // Only the global snapshot is sampled here, so the per-credential
            // ordering passed in doesn't matter.
            let snapshot = stats.stats_snapshot(&[]);
            let cost = stats.cost_snapshot();
            history.record(&snapshot.global, cost.cost_usd);
        }
    })
}

/// Reacts to a credential-file or routing-table change the same way the
/// corresponding admin endpoint does (`routes::control::reload` for
/// credentials; `TableRouter::swap` for routing), so a hot-reload and a
/// manually triggered `/reload` converge on identical behavior.
fn spawn_reload_watcher(
    state: Arc<AppState>,
    credentials_path: std::path::PathBuf,
    routing_path: std::path::PathBuf,
) -> gateway_config::WatchHandle {
    let (handle, mut events) = gateway_config::spawn_watch(
        credentials_path.clone(),
        routing_path.clone(),
        Duration::from_millis(300),
    );

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event.file {
                gateway_config::WatchedFile::Credentials => {
                    match gateway_config::load_credentials(&credentials_path, &state.config.pool) {
                        Ok(loaded) => {
                            let mut pool = state.pool.lock().await;
                            let summary = gateway_pool::apply_reload(
                                &mut pool,
                                &loaded.specs,
                                state.config.telemetry.latency_window,
                            );
                            let ids = pool.credential_ids();
                            drop(pool);
                            state.stats.sync_credentials(&ids);
                            tracing::info!(added = summary.added, removed = summary.removed, "credentials hot-reloaded");
                        }
                        Err(err) => tracing::warn!(error = %err, "failed to reload credentials"),
                    }
                }
                gateway_config::WatchedFile::Routing => match gateway_routing::load(&routing_path) {
                    Ok(loaded) => {
                        state.router.swap(loaded.config);
                        tracing::info!("routing table hot-reloaded");
                    }
                    Err(err) => tracing::warn!(error = %err, "failed to reload routing table"),
                },
            }
        }
    });

    handle
}

/// Waits for Ctrl-C, then gives in-flight requests `timeout` to drain before
/// returning and letting `axum::serve` stop accepting new connections. No
/// precedent in the pack for this exact shape; it mirrors the spirit of
/// `gateway_admission`'s own queue-timeout bookkeeping (bounded wait, then
/// give up) applied to shutdown instead of admission.
async fn shutdown_signal(state: Arc<AppState>, timeout: Duration) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl-C handler");
    };

    ctrl_c.await;
    tracing::info!(?timeout, "shutdown signal received, draining in-flight requests");

    let waited = Instant::now();
    while state.admission.snapshot().current > 0 && waited.elapsed() < timeout {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    if state.admission.snapshot().current > 0 {
        state.stats.record_shutdown_aborted();
        tracing::warn!("shutdown timeout elapsed with requests still in flight");
    }

    let _ = state.stats.flush();
}
