use connectors::error::ConnectorError;
use engine_core::error::{JobStoreError, StateStoreError};
use engine_processing::error::{ImageError, TransformError};
use thiserror::Error;

/// Job-level migration failures. Per-record trouble never surfaces here;
/// it is logged on the job and counted in the checkpoint instead.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Initialization failed: {0}")]
    Init(#[source] ConnectorError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Jobs(#[from] JobStoreError),

    #[error(transparent)]
    State(#[from] StateStoreError),

    #[error("No checkpoint found to resume from")]
    NoCheckpoint,

    #[error("Field mapping unusable: {0}")]
    Mapping(String),

    #[error("Stop requested")]
    Cancelled,
}

/// What went wrong with a single record. Caught by the orchestrator loop.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Jobs(#[from] JobStoreError),

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
