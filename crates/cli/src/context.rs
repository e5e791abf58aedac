use crate::error::CliError;
use connectors::{
    blob::{BlobStore, HttpBlobStore},
    commerce::{CommerceApi, http::HttpCommerceClient},
    source::{SourceStore, mysql::MySqlSourceStore, schema::SourceSchema},
};
use engine_core::{
    config::RuntimeConfig,
    jobs::JobService,
    state::{StateStore, sled_store::SledStateStore},
};
use std::{path::PathBuf, sync::Arc};

/// Everything a command needs to talk to the outside world: connectors,
/// the state store and the job service, built once from the environment.
pub struct AppContext {
    pub config: RuntimeConfig,
    pub source: Arc<dyn SourceStore>,
    pub commerce: Arc<dyn CommerceApi>,
    pub blob: Arc<dyn BlobStore>,
    pub state: Arc<dyn StateStore>,
    pub jobs: JobService,
}

impl AppContext {
    pub async fn from_env() -> Result<Self, CliError> {
        let config = RuntimeConfig::from_env()?;

        let source = MySqlSourceStore::connect(
            &config.source_database_url,
            SourceSchema::default(),
            config.request_timeout,
        )
        .await?;
        let commerce = HttpCommerceClient::new(
            &config.commerce_api_url,
            &config.commerce_api_token,
            config.request_timeout,
        )?;
        let blob = HttpBlobStore::new(&config.blob_store_url, config.request_timeout)?;

        let state = open_state_store()?;
        let jobs = JobService::new(state.clone());

        Ok(AppContext {
            config,
            source: Arc::new(source),
            commerce: Arc::new(commerce),
            blob: Arc::new(blob),
            state,
            jobs,
        })
    }
}

/// Opens the on-disk state store without touching the source or target.
/// Commands that only inspect jobs use this instead of a full context.
pub fn open_state_store() -> Result<Arc<dyn StateStore>, CliError> {
    let store = SledStateStore::open(state_dir()?)
        .map_err(|err| CliError::Unexpected(format!("Failed to open state store: {err}")))?;
    Ok(Arc::new(store))
}

fn state_dir() -> Result<PathBuf, CliError> {
    let home = dirs::home_dir()
        .ok_or_else(|| CliError::Unexpected("Could not determine home directory".into()))?;
    Ok(home.join(".caravel/state"))
}

/// Where `serve` writes export artifacts when the caller does not choose.
pub fn default_export_dir() -> Result<PathBuf, CliError> {
    let home = dirs::home_dir()
        .ok_or_else(|| CliError::Unexpected("Could not determine home directory".into()))?;
    Ok(home.join(".caravel/exports"))
}
