use connectors::error::ConnectorError;
use model::payload::PayloadError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Record {record_id} failed validation: {source}")]
    InvalidPayload {
        record_id: u64,
        #[source]
        source: PayloadError,
    },

    #[error("Record {record_id} has no usable price")]
    MissingPrice { record_id: u64 },

    #[error("Unknown unit label '{0}'")]
    UnknownUnit(String),
}

#[derive(Error, Debug)]
pub enum ImageError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error("Could not build URL from '{raw}': {reason}")]
    BadUrl { raw: String, reason: String },

    #[error("All {attempts} resolution attempts failed for '{raw}'")]
    Unresolvable { raw: String, attempts: usize },

    #[error("Limiter closed")]
    LimiterClosed,
}
