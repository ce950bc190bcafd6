//! Start and stop of the job system.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::handler::HandlerRegistry;
use super::queue::JobQueue;
use super::service::JobService;
use super::store::{JobStoreError, SharedJobStore};
use super::worker::{JobWorker, WorkerError, WorkerHandle, WorkerStats};

/// Owns the queue, the stop token and the running worker.
///
/// Exactly one worker exists per coordinator. Jobs still queued when
/// [`stop`](Self::stop) returns stay `PENDING` in the store; they are not resumed
/// on the next start.
#[derive(Debug)]
pub struct JobCoordinator {
    queue: Arc<JobQueue>,
    store: SharedJobStore,
    stop: CancellationToken,
    worker: WorkerHandle,
}

impl JobCoordinator {
    /// Initialize the store, then spawn the worker.
    pub async fn start(
        store: SharedJobStore,
        handlers: HandlerRegistry,
        worker_name: &str,
    ) -> Result<Self, JobStoreError> {
        store.init().await?;

        let queue = Arc::new(JobQueue::new());
        let stop = CancellationToken::new();
        let worker = JobWorker::new(queue.clone(), store.clone(), Arc::new(handlers))
            .with_name(worker_name)
            .spawn(stop.clone());

        info!(worker = worker_name, "job system started");
        Ok(Self { queue, store, stop, worker })
    }

    pub fn service(&self) -> JobService {
        JobService::new(self.queue.clone(), self.store.clone(), self.stop.clone())
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    pub fn worker_stats(&self) -> WorkerStats {
        self.worker.stats()
    }

    /// True if the worker has exited, which before `stop` means it failed.
    pub fn worker_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Signal stop and wait for the worker. A job already running finishes first.
    ///
    /// Returns the worker's fatal error if it died on a store failure.
    pub async fn stop(self) -> Result<(), WorkerError> {
        let outcome = self.worker.shutdown().await;

        let abandoned = self.queue.len();
        if abandoned > 0 {
            warn!(pending = abandoned, "job system stopped with jobs still queued");
        } else {
            info!("job system stopped");
        }
        outcome
    }
}
