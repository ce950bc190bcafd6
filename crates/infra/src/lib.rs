//! Infrastructure layer: job queue, worker, durable store, configuration.

pub mod config;
pub mod jobs;
