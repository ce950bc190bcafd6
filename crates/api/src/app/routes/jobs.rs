use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use taskq_core::JobId;
use taskq_infra::jobs::JobService;

use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(submit_job).get(list_jobs))
        .route("/:id", get(get_job))
}

pub async fn submit_job(
    Extension(service): Extension<JobService>,
    body: Result<Json<dto::SubmitJobRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.body_text()),
    };

    match service.submit(&body.job_type, &body.payload).await {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_job(
    Extension(service): Extension<JobService>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: JobId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"),
    };

    match service.get(id).await {
        Ok(job) => Json(job).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_jobs(Extension(service): Extension<JobService>) -> axum::response::Response {
    match service.list().await {
        Ok(jobs) => Json(jobs).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Records still waiting in the in-memory queue.
pub async fn list_queue(Extension(service): Extension<JobService>) -> impl IntoResponse {
    Json(service.pending())
}
