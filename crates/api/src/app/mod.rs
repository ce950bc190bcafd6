//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request DTOs
//! - `errors.rs`: consistent error responses

use axum::{Extension, Router};

use taskq_infra::jobs::JobService;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `server.rs`).
pub fn build_app(service: JobService) -> Router {
    routes::router().layer(Extension(service))
}
