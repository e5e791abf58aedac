use crate::{error::ApiError, response::ApiResponse, routes::AppState};
use axum::{Json, extract::State};
use connectors::{
    images::ImageFetcher,
    source::{SourceStore, mysql::MySqlSourceStore, schema::SourceSchema},
};
use engine_processing::images::{pipeline::ImagePipeline, resolver::ImageResolver};
use engine_runtime::migration::{self, MigrateOptions, MigrationOrchestrator};
use model::job::{JobKind, JobStatus};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Starts a migration job and returns its id immediately. The image
/// pipeline and entity cache are created fresh per job so no mutable
/// state is shared between concurrently running migrations.
pub async fn start_migration(
    State(state): State<AppState>,
    Json(options): Json<MigrateOptions>,
) -> Result<ApiResponse<Value>, ApiError> {
    let params = serde_json::to_value(&options)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let job = state.jobs.create(JobKind::Migrate, params).await?;

    let mapping = match migration::resolve_mapping(&options, &state.state).await {
        Ok(mapping) => mapping,
        Err(err) => {
            // Unusable mapping is a fatal-init condition: fail the job.
            state
                .jobs
                .append_error(&job.id, err.to_string(), None)
                .await?;
            state.jobs.set_status(&job.id, JobStatus::Failed).await?;
            return Err(err.into());
        }
    };
    let source = match mapping {
        Some(mapping) => {
            let mapped = MySqlSourceStore::connect(
                &state.config.source_database_url,
                SourceSchema::with_mapping(&mapping),
                state.config.request_timeout,
            )
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
            Arc::new(mapped) as Arc<dyn SourceStore>
        }
        None => state.source.clone(),
    };

    let orchestrator = build_orchestrator(&state, source)?;
    let cancel = CancellationToken::new();
    state
        .cancellations
        .write()
        .await
        .insert(job.id.clone(), cancel.clone());

    let job_id = job.id.clone();
    let cancellations = state.cancellations.clone();
    tokio::spawn(async move {
        if let Err(err) = orchestrator.run(&job_id, options, cancel).await {
            error!(job_id = %job_id, error = %err, "Migration job failed");
        }
        cancellations.write().await.remove(&job_id);
    });

    Ok(ApiResponse::success(json!({ "job_id": job.id })))
}

fn build_orchestrator(
    state: &AppState,
    source: Arc<dyn SourceStore>,
) -> Result<MigrationOrchestrator, ApiError> {
    let config = &state.config;
    let fetcher = Arc::new(
        ImageFetcher::new(config.request_timeout)
            .map_err(|e| ApiError::Internal(e.to_string()))?,
    );
    let resolver = Arc::new(
        ImageResolver::new(
            fetcher.clone(),
            &config.media_base_url,
            &config.placeholder_image_url,
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?,
    );
    let images = Arc::new(ImagePipeline::new(
        fetcher,
        state.blob.clone(),
        resolver,
        config.image_workers,
        config.retry_policy(),
        &config.blob_key_prefix,
    ));

    Ok(MigrationOrchestrator::new(
        source,
        state.commerce.clone(),
        images,
        state.state.clone(),
        state.jobs.clone(),
        config.retry_policy(),
        &config.currency_code,
        config.batch_size,
    ))
}
