//! Job handlers and their registry.
//!
//! A handler is a plain synchronous function from the decoded payload to a
//! [`JobOutcome`]. The worker runs it on a blocking thread and records the outcome;
//! handlers never see the queue or the store.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

/// Job type whose built-in handler always fails.
pub const FAILURE_TEST_TYPE: &str = "error_test";

/// Message recorded for [`FAILURE_TEST_TYPE`] jobs.
pub const SIMULATED_FAILURE: &str = "Simulated Failure requested by user";

/// Result of running a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Completed; the string becomes the job's result.
    Success(String),
    /// Failed; the string describes why.
    Failure(String),
}

impl JobOutcome {
    pub fn success(result: impl Into<String>) -> Self {
        Self::Success(result.into())
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure(reason.into())
    }
}

impl<E: fmt::Display> From<Result<String, E>> for JobOutcome {
    fn from(value: Result<String, E>) -> Self {
        match value {
            Ok(result) => Self::Success(result),
            Err(e) => Self::Failure(e.to_string()),
        }
    }
}

/// Job handler function type.
pub type JobHandler = Arc<dyn Fn(&Value) -> JobOutcome + Send + Sync>;

/// Handlers keyed by job type.
///
/// Resolution order: exact type, then the longest matching category pattern
/// (`"image.*"` matches `"image.resize"`), then the wildcard `"*"`.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, JobHandler>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut patterns: Vec<_> = self.handlers.keys().collect();
        patterns.sort();
        f.debug_struct("HandlerRegistry")
            .field("patterns", &patterns)
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in handlers: [`FAILURE_TEST_TYPE`] plus a wildcard
    /// processor for every other type. Both spend `work` before answering.
    pub fn with_builtins(work: Duration) -> Self {
        let mut registry = Self::new();
        registry.register("*", builtin::process(work));
        registry.register(FAILURE_TEST_TYPE, builtin::always_fail(work));
        registry
    }

    /// Register a handler for a job type or pattern, replacing any previous one.
    pub fn register<F>(&mut self, pattern: impl Into<String>, handler: F)
    where
        F: Fn(&Value) -> JobOutcome + Send + Sync + 'static,
    {
        self.handlers.insert(pattern.into(), Arc::new(handler));
    }

    /// Find the handler for a job type.
    pub fn resolve(&self, job_type: &str) -> Option<JobHandler> {
        if let Some(h) = self.handlers.get(job_type) {
            return Some(h.clone());
        }

        let category = self
            .handlers
            .iter()
            .filter_map(|(pattern, handler)| {
                let prefix = pattern.strip_suffix(".*")?;
                let rest = job_type.strip_prefix(prefix)?;
                rest.starts_with('.').then_some((prefix.len(), handler))
            })
            .max_by_key(|(len, _)| *len);
        if let Some((_, h)) = category {
            return Some(h.clone());
        }

        self.handlers.get("*").cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Built-in handlers.
pub mod builtin {
    use super::*;

    /// Simulates `work`, then reports the payload it processed.
    pub fn process(work: Duration) -> impl Fn(&Value) -> JobOutcome + Send + Sync + 'static {
        move |payload| {
            simulate(work);
            JobOutcome::success(format!("Processed successfully: {payload}"))
        }
    }

    /// Simulates `work`, then fails with [`SIMULATED_FAILURE`].
    pub fn always_fail(work: Duration) -> impl Fn(&Value) -> JobOutcome + Send + Sync + 'static {
        move |_payload| {
            simulate(work);
            JobOutcome::failure(SIMULATED_FAILURE)
        }
    }

    fn simulate(work: Duration) {
        if !work.is_zero() {
            std::thread::sleep(work);
        }
    }
}
