use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use connectors::error::ConnectorError;
use engine_core::error::{JobStoreError, StateStoreError};
use engine_runtime::error::{ExportError, MigrationError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Jobs(#[from] JobStoreError),

    #[error(transparent)]
    State(#[from] StateStoreError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Jobs(JobStoreError::NotFound(_)) | ApiError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Jobs(JobStoreError::InvalidTransition { .. }) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) | ApiError::Migration(MigrationError::Mapping(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Migration(MigrationError::Connector(
                ConnectorError::DuplicateConflict { .. },
            )) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "success": false,
            "error": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::job::JobStatus;

    #[test]
    fn unknown_job_maps_to_404() {
        let err = ApiError::Jobs(JobStoreError::NotFound("abc".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_transition_maps_to_409() {
        let err = ApiError::Jobs(JobStoreError::InvalidTransition {
            job_id: "abc".into(),
            from: JobStatus::Completed,
            to: JobStatus::Running,
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn bad_request_maps_to_400() {
        assert_eq!(
            ApiError::BadRequest("tables must not be empty".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
