//! Background job system.
//!
//! ## Design
//!
//! - Submission persists a `PENDING` record, then enqueues it
//! - One worker drains the queue in FIFO order, one job at a time
//! - The store is authoritative for status; the queue only orders work
//! - Handler outcomes are values (`JobOutcome`), never raised errors
//! - No retries, backoff or dead-letter handling
//!
//! ## Components
//!
//! - `JobQueue`: in-memory FIFO with a blocking receive
//! - `JobStore`: durable records (SQLite, or in-memory for tests)
//! - `HandlerRegistry`: job type to handler resolution
//! - `JobWorker`: the loop that runs jobs and records their outcome
//! - `JobService`: submit and query
//! - `JobCoordinator`: start/stop of the whole system

pub mod handler;
pub mod lifecycle;
pub mod queue;
pub mod service;
pub mod store;
pub mod worker;

pub use handler::{HandlerRegistry, JobHandler, JobOutcome};
pub use lifecycle::JobCoordinator;
pub use queue::JobQueue;
pub use service::{JobService, JobServiceError};
pub use store::{InMemoryJobStore, JobStore, JobStoreError, SharedJobStore, SqliteJobStore};
pub use worker::{JobWorker, WorkerError, WorkerHandle, WorkerStats};
