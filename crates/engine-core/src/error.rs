use model::job::JobStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Failed to encode {kind} document: {source}")]
    Encode {
        kind: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to decode {kind} document: {source}")]
    Decode {
        kind: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Error, Debug)]
pub enum JobStoreError {
    #[error(transparent)]
    State(#[from] StateStoreError),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Invalid status transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}
