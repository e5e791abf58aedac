use crate::{error::ApiError, response::ApiResponse, routes::AppState};
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use engine_core::state::StateStore;
use engine_runtime::report;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct ReportQuery {
    pub format: Option<String>,
}

/// Returns the persisted report for a job, generating one on demand from
/// the job document and checkpoint when none was stored yet.
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let job = state.jobs.get(&id).await?;

    let summary = match state.state.load_report(&id).await? {
        Some(stored) => stored,
        None => {
            let checkpoint = state.state.load_checkpoint(&id).await?;
            report::migration_report(&job, checkpoint.as_ref())
        }
    };

    match query.format.as_deref() {
        None | Some("json") => Ok(ApiResponse::success(summary).into_response()),
        Some("csv") => {
            let csv = report::to_csv(&summary)?;
            Ok(([(header::CONTENT_TYPE, "text/csv")], csv).into_response())
        }
        Some(other) => Err(ApiError::BadRequest(format!(
            "unsupported report format '{other}'"
        ))),
    }
}
