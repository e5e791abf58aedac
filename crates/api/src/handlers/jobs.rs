use crate::{error::ApiError, response::ApiResponse, routes::AppState};
use axum::extract::{Path, State};
use model::job::Job;
use serde_json::{Value, json};
use tracing::info;

pub async fn list_jobs(State(state): State<AppState>) -> Result<ApiResponse<Vec<Job>>, ApiError> {
    Ok(ApiResponse::success(state.jobs.list().await?))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Job>, ApiError> {
    Ok(ApiResponse::success(state.jobs.get(&id).await?))
}

pub async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    let job = state.jobs.get(&id).await?;
    Ok(ApiResponse::success(json!({
        "id": job.id,
        "kind": job.kind,
        "status": job.status,
        "progress": job.progress,
        "errors": job.errors.len(),
    })))
}

/// Requests a stop. The running job honors it at the next record
/// boundary, so the status flips to cancelled shortly after, not
/// immediately.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    // 404 for unknown ids before consulting the token map.
    state.jobs.get(&id).await?;

    match state.cancellations.read().await.get(&id) {
        Some(token) => {
            token.cancel();
            info!(job_id = %id, "Stop requested");
            Ok(ApiResponse::success(json!({ "job_id": id, "stopping": true })))
        }
        None => Err(ApiError::BadRequest(format!(
            "job {id} is not running in this process"
        ))),
    }
}
