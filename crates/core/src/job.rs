//! Job record and its lifecycle state machine.
//!
//! ```text
//! PENDING --dequeued--> RUNNING --succeeded--> DONE
//!                               \--failed----> FAILED
//! ```
//!
//! `DONE` and `FAILED` are terminal. [`JobStatus::apply`] is the only place a
//! transition is decided; stores call it (or mirror it with
//! [`JobEvent::source`]/[`JobEvent::target`]) at the point of update.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DomainError, DomainResult};
use crate::id::JobId;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Created and queued, waiting for the worker
    Pending,
    /// Picked up by the worker, handler in progress
    Running,
    /// Handler returned successfully
    Done,
    /// Handler reported a failure
    Failed,
}

impl JobStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Done => "DONE",
            JobStatus::Failed => "FAILED",
        }
    }

    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// Next status after `event`, or an error if the event does not apply.
    pub fn apply(self, event: JobEvent) -> DomainResult<JobStatus> {
        if self == event.source() {
            Ok(event.target())
        } else {
            Err(DomainError::InvalidTransition { from: self, event })
        }
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "RUNNING" => Ok(JobStatus::Running),
            "DONE" => Ok(JobStatus::Done),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(DomainError::validation(format!("unknown job status: {other}"))),
        }
    }
}

/// Something that happened to a job while the worker owned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEvent {
    /// Taken off the queue by the worker
    Dequeued,
    /// Handler returned a result
    Succeeded,
    /// Handler reported a failure
    Failed,
}

impl JobEvent {
    /// The only status this event may be applied to.
    pub const fn source(self) -> JobStatus {
        match self {
            JobEvent::Dequeued => JobStatus::Pending,
            JobEvent::Succeeded | JobEvent::Failed => JobStatus::Running,
        }
    }

    /// The status reached after this event.
    pub const fn target(self) -> JobStatus {
        match self {
            JobEvent::Dequeued => JobStatus::Running,
            JobEvent::Succeeded => JobStatus::Done,
            JobEvent::Failed => JobStatus::Failed,
        }
    }
}

impl core::fmt::Display for JobEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            JobEvent::Dequeued => "dequeued",
            JobEvent::Succeeded => "succeeded",
            JobEvent::Failed => "failed",
        })
    }
}

/// A unit of work and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    /// Selects the handler that runs this job.
    #[serde(rename = "type")]
    pub job_type: String,
    /// Serialized JSON, passed to the handler as-is.
    pub payload: String,
    pub status: JobStatus,
    /// Handler output or failure description; only set once terminal.
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a new pending record with a fresh id.
    pub fn new(job_type: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            job_type: job_type.into(),
            payload: payload.into(),
            status: JobStatus::Pending,
            result: None,
            created_at: Utc::now(),
        }
    }

    /// Create a new pending record, serializing a structured payload.
    pub fn from_json(job_type: impl Into<String>, payload: &Value) -> Self {
        Self::new(job_type, payload.to_string())
    }

    /// Parse the stored payload back into JSON.
    pub fn decode_payload(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }

    /// Apply `event`, recording `result` if the new status is terminal.
    pub fn apply(&mut self, event: JobEvent, result: Option<String>) -> DomainResult<()> {
        let next = self.status.apply(event)?;
        self.status = next;
        if next.is_terminal() {
            self.result = result;
        }
        Ok(())
    }
}
