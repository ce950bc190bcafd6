//! `taskq-core`: job domain building blocks.
//!
//! This crate contains **pure domain** primitives (no IO, no async): identifiers,
//! the job record and its status state machine.

pub mod error;
pub mod id;
pub mod job;

pub use error::{DomainError, DomainResult};
pub use id::JobId;
pub use job::{JobEvent, JobRecord, JobStatus};
