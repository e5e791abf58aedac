use axum::{
    Router,
    routing::{get, post},
};
use connectors::{blob::BlobStore, commerce::CommerceApi, source::SourceStore};
use engine_core::{config::RuntimeConfig, jobs::JobService, state::StateStore};
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    discover::discover,
    export::start_export,
    health::health,
    jobs::{cancel_job, get_job, job_status, list_jobs},
    migrate::start_migration,
    report::get_report,
};

/// Shared state behind the control API. Connectors and the state store are
/// process-wide; per-job mutable state (pipelines, caches, checkpoints) is
/// created inside the job handlers, never here.
#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub source: Arc<dyn SourceStore>,
    pub commerce: Arc<dyn CommerceApi>,
    pub blob: Arc<dyn BlobStore>,
    pub state: Arc<dyn StateStore>,
    pub jobs: JobService,
    pub export_dir: PathBuf,
    /// Stop tokens for jobs running in this process.
    pub cancellations: Arc<RwLock<HashMap<String, CancellationToken>>>,
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/discover", get(discover).post(discover))
        .route("/export", post(start_export))
        .route("/migrate", post(start_migration))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/cancel", post(cancel_job))
        .route("/job/{id}/status", get(job_status))
        .route("/report/{id}", get(get_report))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
