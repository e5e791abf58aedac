use crate::{error::ApiError, response::ApiResponse, routes::AppState};
use axum::{Json, extract::State};
use engine_runtime::export::{ExportEngine, ExportOptions};
use model::job::JobKind;
use serde_json::{Value, json};
use tracing::error;

/// Starts a backup job and returns immediately; the export runs in the
/// background and reports through the job document.
pub async fn start_export(
    State(state): State<AppState>,
    Json(options): Json<ExportOptions>,
) -> Result<ApiResponse<Value>, ApiError> {
    if options.tables.is_empty() {
        return Err(ApiError::BadRequest("tables must not be empty".into()));
    }

    let params = serde_json::to_value(&options)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let job = state.jobs.create(JobKind::Backup, params).await?;

    let engine = ExportEngine::new(
        state.source.clone(),
        state.jobs.clone(),
        state.state.clone(),
        state.config.retry_policy(),
    );
    let job_id = job.id.clone();
    let output_dir = state.export_dir.join(&job_id);
    tokio::spawn(async move {
        if let Err(err) = engine.run(&job_id, &options, &output_dir).await {
            error!(job_id = %job_id, error = %err, "Export job failed");
        }
    });

    Ok(ApiResponse::success(json!({ "job_id": job.id })))
}
