use axum::{routing::get, Router};

pub mod jobs;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/queue", get(jobs::list_queue))
        .nest("/jobs", jobs::router())
}
