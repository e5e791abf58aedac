use crate::{error::ApiError, response::ApiResponse, routes::AppState};
use axum::extract::State;
use engine_runtime::discovery;
use serde_json::{Value, json};

/// Discovery is fast enough to run synchronously: the caller gets the
/// ranked candidates and generated mapping in the response body.
pub async fn discover(State(state): State<AppState>) -> Result<ApiResponse<Value>, ApiError> {
    let outcome = discovery::run(state.source.as_ref(), &state.jobs, &state.state).await?;
    Ok(ApiResponse::success(json!({
        "job_id": outcome.job.id,
        "result": {
            "tables": outcome.result.tables,
            "candidates": outcome.result.candidates,
        },
        "mapping": outcome.mapping,
    })))
}
