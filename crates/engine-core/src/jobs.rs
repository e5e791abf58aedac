use crate::{
    error::JobStoreError,
    state::StateStore,
};
use chrono::Utc;
use model::job::{Job, JobErrorEntry, JobKind, JobProgress, JobStatus};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::debug;

/// Job control plane. All mutations read-modify-persist the full job
/// document and refresh an in-memory cache keyed by job id for fast
/// re-reads within the process lifetime.
#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn StateStore>,
    cache: Arc<RwLock<HashMap<String, Job>>>,
}

impl JobService {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        JobService {
            store,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn create(
        &self,
        kind: JobKind,
        params: serde_json::Value,
    ) -> Result<Job, JobStoreError> {
        let job = Job::new(kind, params);
        self.persist(job.clone()).await?;
        debug!(job_id = %job.id, kind = %job.kind, "Created job");
        Ok(job)
    }

    /// Applies a status transition. Transitions are monotonic: once a job
    /// is completed, failed or cancelled it never leaves that status.
    pub async fn set_status(&self, job_id: &str, status: JobStatus) -> Result<Job, JobStoreError> {
        let mut job = self.fetch(job_id).await?;
        if !job.status.can_transition_to(status) {
            return Err(JobStoreError::InvalidTransition {
                job_id: job_id.to_string(),
                from: job.status,
                to: status,
            });
        }

        let now = Utc::now();
        if status == JobStatus::Running && job.started_at.is_none() {
            job.started_at = Some(now);
        }
        if status.is_terminal() && job.finished_at.is_none() {
            job.finished_at = Some(now);
        }
        job.status = status;
        self.persist(job.clone()).await?;
        Ok(job)
    }

    /// Last-write-wins merge of progress fields; `None` fields in the
    /// update leave the stored value untouched.
    pub async fn merge_progress(
        &self,
        job_id: &str,
        progress: JobProgress,
    ) -> Result<Job, JobStoreError> {
        let mut job = self.fetch(job_id).await?;
        if progress.total.is_some() {
            job.progress.total = progress.total;
        }
        job.progress.current = progress.current;
        if progress.message.is_some() {
            job.progress.message = progress.message;
        }
        self.persist(job.clone()).await?;
        Ok(job)
    }

    pub async fn append_error(
        &self,
        job_id: &str,
        message: impl Into<String>,
        context: Option<String>,
    ) -> Result<Job, JobStoreError> {
        let mut job = self.fetch(job_id).await?;
        job.errors.push(JobErrorEntry {
            at: Utc::now(),
            message: message.into(),
            context,
        });
        self.persist(job.clone()).await?;
        Ok(job)
    }

    pub async fn attach_artifact(
        &self,
        job_id: &str,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Job, JobStoreError> {
        let mut job = self.fetch(job_id).await?;
        job.artifacts.insert(name.into(), value.into());
        self.persist(job.clone()).await?;
        Ok(job)
    }

    pub async fn get(&self, job_id: &str) -> Result<Job, JobStoreError> {
        if let Some(job) = self.cache.read().await.get(job_id) {
            return Ok(job.clone());
        }
        self.fetch(job_id).await
    }

    pub async fn list(&self) -> Result<Vec<Job>, JobStoreError> {
        Ok(self.store.list_jobs().await?)
    }

    async fn fetch(&self, job_id: &str) -> Result<Job, JobStoreError> {
        self.store
            .load_job(job_id)
            .await?
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))
    }

    async fn persist(&self, job: Job) -> Result<(), JobStoreError> {
        self.store.save_job(&job).await?;
        self.cache.write().await.insert(job.id.clone(), job);
        Ok(())
    }
}
