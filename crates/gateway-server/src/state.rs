//! Shared application state, built once at startup and handed to every
//! handler behind an `Arc` (axum's usual `State<Arc<AppState>>` idiom).

use crate::cost_model::CostModel;
use crate::logs::LogRing;
use gateway_admission::AdmissionGate;
use gateway_config::GatewayConfig;
use gateway_events::EventBus;
use gateway_forwarder::Forwarder;
use gateway_pool::Pool;
use gateway_routing::TableRouter;
use gateway_stats::StatsAggregator;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Everything a handler needs, gathered in one place so the router
/// assembly in `main` stays a flat list of routes.
pub struct AppState {
    pub config: GatewayConfig,
    pub pool: Arc<Mutex<Pool>>,
    pub admission: Arc<AdmissionGate>,
    pub forwarder: Arc<Forwarder>,
    pub stats: Arc<StatsAggregator>,
    pub events: Arc<EventBus>,
    pub router: Arc<TableRouter>,
    pub history: Arc<crate::history::HistoryTracker>,
    pub cost_model: CostModel,
    pub logs: Arc<LogRing>,
    pub paused: AtomicBool,
    pub started_at: Instant,
    pub credentials_path: PathBuf,
    pub routing_path: PathBuf,
}

impl AppState {
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;
