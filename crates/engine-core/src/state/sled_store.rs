use crate::{error::StateStoreError, state::StateStore};
use async_trait::async_trait;
use model::{checkpoint::MigrationCheckpoint, job::Job, mapping::FieldMapping};
use std::path::Path;

/// Sled-backed store. Job/mapping/report documents are stored as JSON
/// (jobs carry arbitrary `serde_json::Value` params, which bincode cannot
/// round-trip); checkpoints are small fixed structs and use bincode.
pub struct SledStateStore {
    db: sled::Db,
}

impl SledStateStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    #[inline]
    fn job_key(job_id: &str) -> String {
        format!("job:{job_id}")
    }

    #[inline]
    fn chk_key(job_id: &str) -> String {
        format!("chk:{job_id}")
    }

    #[inline]
    fn map_key(job_id: &str) -> String {
        format!("map:{job_id}")
    }

    #[inline]
    fn rep_key(job_id: &str) -> String {
        format!("rep:{job_id}")
    }

    fn put_json<T: serde::Serialize>(
        &self,
        key: String,
        value: &T,
        kind: &'static str,
    ) -> Result<(), StateStoreError> {
        let bytes = serde_json::to_vec(value).map_err(|e| StateStoreError::Encode {
            kind,
            source: Box::new(e),
        })?;
        self.db.insert(key, bytes)?;
        Ok(())
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: String,
        kind: &'static str,
    ) -> Result<Option<T>, StateStoreError> {
        match self.db.get(key)? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|e| StateStoreError::Decode {
                    kind,
                    source: Box::new(e),
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StateStore for SledStateStore {
    async fn save_job(&self, job: &Job) -> Result<(), StateStoreError> {
        self.put_json(Self::job_key(&job.id), job, "job")
    }

    async fn load_job(&self, job_id: &str) -> Result<Option<Job>, StateStoreError> {
        self.get_json(Self::job_key(job_id), "job")
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StateStoreError> {
        let mut jobs = Vec::new();
        for item in self.db.scan_prefix("job:") {
            let (_key, bytes) = item?;
            let job: Job = serde_json::from_slice(&bytes).map_err(|e| StateStoreError::Decode {
                kind: "job",
                source: Box::new(e),
            })?;
            jobs.push(job);
        }
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn save_checkpoint(&self, cp: &MigrationCheckpoint) -> Result<(), StateStoreError> {
        let bytes = bincode::serialize(cp).map_err(|e| StateStoreError::Encode {
            kind: "checkpoint",
            source: e,
        })?;
        self.db.insert(Self::chk_key(&cp.job_id), bytes)?;
        Ok(())
    }

    async fn load_checkpoint(
        &self,
        job_id: &str,
    ) -> Result<Option<MigrationCheckpoint>, StateStoreError> {
        match self.db.get(Self::chk_key(job_id))? {
            Some(bytes) => {
                let cp = bincode::deserialize(&bytes).map_err(|e| StateStoreError::Decode {
                    kind: "checkpoint",
                    source: e,
                })?;
                Ok(Some(cp))
            }
            None => Ok(None),
        }
    }

    async fn save_mapping(
        &self,
        job_id: &str,
        mapping: &FieldMapping,
    ) -> Result<(), StateStoreError> {
        self.put_json(Self::map_key(job_id), mapping, "mapping")
    }

    async fn load_mapping(&self, job_id: &str) -> Result<Option<FieldMapping>, StateStoreError> {
        self.get_json(Self::map_key(job_id), "mapping")
    }

    async fn save_report(
        &self,
        job_id: &str,
        report: &serde_json::Value,
    ) -> Result<(), StateStoreError> {
        self.put_json(Self::rep_key(job_id), report, "report")
    }

    async fn load_report(
        &self,
        job_id: &str,
    ) -> Result<Option<serde_json::Value>, StateStoreError> {
        self.get_json(Self::rep_key(job_id), "report")
    }
}
