use connectors::error::ConnectorError;
use engine_core::error::{ConfigError, JobStoreError, StateStoreError};
use engine_runtime::error::{ExportError, MigrationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Migration failed: {0}")]
    Migration(#[from] MigrationError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Job store error: {0}")]
    Jobs(#[from] JobStoreError),

    #[error("State store error: {0}")]
    State(#[from] StateStoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error("Invalid listen address: {0}")]
    InvalidAddr(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
