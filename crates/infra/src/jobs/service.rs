//! Submission and query operations.
//!
//! [`JobService`] is what outer layers (the HTTP API, tests) hold. Submitting
//! persists first and enqueues second, so the worker never dequeues a record the
//! store has not seen.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use taskq_core::{DomainError, JobId, JobRecord};

use super::queue::JobQueue;
use super::store::{JobStoreError, SharedJobStore};

#[derive(Debug, thiserror::Error)]
pub enum JobServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("service is shutting down")]
    ShuttingDown,
    #[error(transparent)]
    Store(#[from] JobStoreError),
}

#[derive(Debug, Clone)]
pub struct JobService {
    queue: Arc<JobQueue>,
    store: SharedJobStore,
    stop: CancellationToken,
}

impl JobService {
    pub fn new(queue: Arc<JobQueue>, store: SharedJobStore, stop: CancellationToken) -> Self {
        Self { queue, store, stop }
    }

    /// Create a `PENDING` job, persist it, and queue it for the worker.
    #[instrument(skip(self, payload), err)]
    pub async fn submit(&self, job_type: &str, payload: &Value) -> Result<JobRecord, JobServiceError> {
        if self.stop.is_cancelled() {
            return Err(JobServiceError::ShuttingDown);
        }
        if job_type.trim().is_empty() {
            return Err(DomainError::validation("job type must not be empty").into());
        }

        let record = JobRecord::from_json(job_type, payload);
        self.store.insert(&record).await?;
        self.queue.enqueue(record.clone());

        debug!(job_id = %record.id, "job submitted");
        Ok(record)
    }

    pub async fn get(&self, id: JobId) -> Result<JobRecord, JobServiceError> {
        self.store.get(id).await?.ok_or(JobServiceError::NotFound(id))
    }

    /// Every known job, oldest first.
    pub async fn list(&self) -> Result<Vec<JobRecord>, JobServiceError> {
        Ok(self.store.list().await?)
    }

    /// Jobs still waiting in the queue, front first. Not authoritative for status.
    pub fn pending(&self) -> Vec<JobRecord> {
        self.queue.snapshot()
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.is_cancelled()
    }
}
