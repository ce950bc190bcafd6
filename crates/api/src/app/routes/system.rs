use axum::{extract::Extension, response::IntoResponse, Json};

use taskq_infra::jobs::JobService;

pub async fn health(Extension(service): Extension<JobService>) -> impl IntoResponse {
    let status = if service.is_stopping() { "stopping" } else { "ok" };
    Json(serde_json::json!({ "status": status }))
}
