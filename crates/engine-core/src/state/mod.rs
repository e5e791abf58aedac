pub mod sled_store;

use crate::error::StateStoreError;
use async_trait::async_trait;
use model::{
    checkpoint::MigrationCheckpoint,
    job::Job,
    mapping::FieldMapping,
};

/// Persistence substrate for job, checkpoint, mapping and report documents,
/// all keyed by job id. Implementations must persist the full document on
/// every save; no partial-field transactions are assumed.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save_job(&self, job: &Job) -> Result<(), StateStoreError>;
    async fn load_job(&self, job_id: &str) -> Result<Option<Job>, StateStoreError>;
    async fn list_jobs(&self) -> Result<Vec<Job>, StateStoreError>;

    async fn save_checkpoint(&self, cp: &MigrationCheckpoint) -> Result<(), StateStoreError>;
    async fn load_checkpoint(
        &self,
        job_id: &str,
    ) -> Result<Option<MigrationCheckpoint>, StateStoreError>;

    async fn save_mapping(&self, job_id: &str, mapping: &FieldMapping)
    -> Result<(), StateStoreError>;
    async fn load_mapping(&self, job_id: &str) -> Result<Option<FieldMapping>, StateStoreError>;

    async fn save_report(
        &self,
        job_id: &str,
        report: &serde_json::Value,
    ) -> Result<(), StateStoreError>;
    async fn load_report(&self, job_id: &str)
    -> Result<Option<serde_json::Value>, StateStoreError>;
}
