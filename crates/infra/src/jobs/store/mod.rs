//! Durable job storage.
//!
//! The store is the authoritative owner of a job's status and result. Every
//! transition goes through [`JobStore::transition`], which checks the event
//! against the *persisted* status before writing, so callers cannot push a record
//! backwards or out of a terminal state.

use std::sync::Arc;

use async_trait::async_trait;

use taskq_core::{DomainError, JobEvent, JobId, JobRecord};

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryJobStore;
pub use sqlite::SqliteJobStore;

/// Job store abstraction.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug {
    /// Prepare the backing storage (schema, tables). Idempotent.
    async fn init(&self) -> Result<(), JobStoreError> {
        Ok(())
    }

    /// Persist a newly created record.
    async fn insert(&self, record: &JobRecord) -> Result<(), JobStoreError>;

    /// Get a record by ID.
    async fn get(&self, id: JobId) -> Result<Option<JobRecord>, JobStoreError>;

    /// Every known record, oldest first.
    async fn list(&self) -> Result<Vec<JobRecord>, JobStoreError>;

    /// Apply `event` to the stored record and return the updated record.
    ///
    /// `result` is recorded only when the event leads to a terminal status.
    async fn transition(
        &self,
        id: JobId,
        event: JobEvent,
        result: Option<String>,
    ) -> Result<JobRecord, JobStoreError>;
}

/// Store handle shared between the submission path and the worker.
pub type SharedJobStore = Arc<dyn JobStore>;

/// Job store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("job {0}: {1}")]
    InvalidTransition(JobId, DomainError),
    #[error("corrupt job row: {0}")]
    Corrupt(String),
    #[error("storage error: {0}")]
    Storage(String),
}
