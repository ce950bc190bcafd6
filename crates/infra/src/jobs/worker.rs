//! The single background worker.
//!
//! One task drains the [`JobQueue`] in order. For each record it persists
//! `RUNNING`, runs the handler on a blocking thread, then persists `DONE` or
//! `FAILED`. The stop token is checked before every receive and while idle, never
//! during a handler call: a job that has started always runs to completion.
//!
//! A failed store write ends the loop. The error is returned through
//! [`WorkerHandle::shutdown`]; nothing restarts the worker.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use taskq_core::{JobEvent, JobRecord, JobStatus};

use super::handler::{HandlerRegistry, JobOutcome};
use super::queue::JobQueue;
use super::store::{JobStoreError, SharedJobStore};

pub const DEFAULT_WORKER_NAME: &str = "taskq-worker";

/// Why the worker loop ended abnormally.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("job store failure: {0}")]
    Store(#[from] JobStoreError),
    #[error("worker task panicked: {0}")]
    Panicked(String),
}

/// Worker runtime statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct WorkerStats {
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    /// Dequeued records that were not `PENDING` in the store (or not in it at all).
    pub jobs_skipped: u64,
}

/// Handle to control and join a running worker.
#[derive(Debug)]
pub struct WorkerHandle {
    stop: CancellationToken,
    join: JoinHandle<Result<(), WorkerError>>,
    stats: Arc<Mutex<WorkerStats>>,
}

impl WorkerHandle {
    /// Cancel the stop token and wait for the loop to return.
    ///
    /// If a handler is running this waits for it, however long it takes.
    pub async fn shutdown(self) -> Result<(), WorkerError> {
        self.stop.cancel();
        match self.join.await {
            Ok(res) => res,
            Err(e) => Err(WorkerError::Panicked(e.to_string())),
        }
    }

    /// True once the loop has returned (stopped or failed).
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Get current worker statistics.
    pub fn stats(&self) -> WorkerStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Executes queued jobs one at a time.
#[derive(Debug)]
pub struct JobWorker {
    name: String,
    queue: Arc<JobQueue>,
    store: SharedJobStore,
    handlers: Arc<HandlerRegistry>,
    stats: Arc<Mutex<WorkerStats>>,
}

impl JobWorker {
    pub fn new(queue: Arc<JobQueue>, store: SharedJobStore, handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            name: DEFAULT_WORKER_NAME.to_string(),
            queue,
            store,
            handlers,
            stats: Arc::new(Mutex::new(WorkerStats::default())),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Spawn the loop on the current tokio runtime.
    pub fn spawn(self, stop: CancellationToken) -> WorkerHandle {
        let stats = self.stats.clone();
        let join = tokio::spawn({
            let stop = stop.clone();
            async move { self.run(stop).await }
        });

        WorkerHandle { stop, join, stats }
    }

    /// Process the head of the queue, if any, without waiting.
    ///
    /// Returns the terminal status reached, or `None` if the queue was empty or the
    /// record was skipped.
    pub async fn run_once(&self) -> Result<Option<JobStatus>, WorkerError> {
        match self.queue.dequeue() {
            Some(record) => self.process(record).await,
            None => Ok(None),
        }
    }

    async fn run(self, stop: CancellationToken) -> Result<(), WorkerError> {
        info!(worker = %self.name, "job worker started");

        let outcome = loop {
            let Some(record) = self.queue.recv(&stop).await else {
                break Ok(());
            };

            if let Err(e) = self.process(record).await {
                error!(worker = %self.name, error = %e, "job worker stopping after store failure");
                break Err(e);
            }
        };

        let stats = *self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        info!(
            worker = %self.name,
            processed = stats.jobs_processed,
            succeeded = stats.jobs_succeeded,
            failed = stats.jobs_failed,
            pending = self.queue.len(),
            "job worker stopped"
        );
        outcome
    }

    async fn process(&self, record: JobRecord) -> Result<Option<JobStatus>, WorkerError> {
        match self.store.transition(record.id, JobEvent::Dequeued, None).await {
            Ok(_) => {}
            // The store is authoritative: a record that is no longer PENDING there
            // (or was never persisted) is not ours to run.
            Err(e @ (JobStoreError::InvalidTransition(..) | JobStoreError::NotFound(_))) => {
                warn!(worker = %self.name, job_id = %record.id, error = %e, "skipping dequeued job");
                self.bump(|s| s.jobs_skipped += 1);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }
        debug!(worker = %self.name, job_id = %record.id, job_type = %record.job_type, "job running");

        let payload = self.decode_payload(&record);
        let (event, result) = match self.invoke(&record.job_type, payload).await {
            JobOutcome::Success(result) => (JobEvent::Succeeded, result),
            JobOutcome::Failure(reason) => (JobEvent::Failed, reason),
        };

        let finished = self.store.transition(record.id, event, Some(result)).await?;
        match finished.status {
            JobStatus::Done => {
                info!(worker = %self.name, job_id = %record.id, job_type = %record.job_type, "job done");
                self.bump(|s| {
                    s.jobs_processed += 1;
                    s.jobs_succeeded += 1;
                });
            }
            _ => {
                warn!(
                    worker = %self.name,
                    job_id = %record.id,
                    job_type = %record.job_type,
                    reason = finished.result.as_deref().unwrap_or_default(),
                    "job failed"
                );
                self.bump(|s| {
                    s.jobs_processed += 1;
                    s.jobs_failed += 1;
                });
            }
        }

        Ok(Some(finished.status))
    }

    fn decode_payload(&self, record: &JobRecord) -> Value {
        record.decode_payload().unwrap_or_else(|e| {
            warn!(job_id = %record.id, error = %e, "payload is not valid JSON; using an empty object");
            Value::Object(Default::default())
        })
    }

    async fn invoke(&self, job_type: &str, payload: Value) -> JobOutcome {
        let Some(handler) = self.handlers.resolve(job_type) else {
            return JobOutcome::failure(format!("no handler registered for job type: {job_type}"));
        };

        match tokio::task::spawn_blocking(move || handler(&payload)).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => {
                JobOutcome::failure(format!("handler panicked: {}", panic_message(e.into_panic())))
            }
            Err(e) => JobOutcome::failure(format!("handler did not complete: {e}")),
        }
    }

    fn bump(&self, update: impl FnOnce(&mut WorkerStats)) {
        update(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
