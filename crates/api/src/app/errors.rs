use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use taskq_core::DomainError;
use taskq_infra::jobs::JobServiceError;

pub fn service_error_to_response(err: JobServiceError) -> axum::response::Response {
    match err {
        JobServiceError::Domain(DomainError::Validation(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        JobServiceError::Domain(DomainError::InvalidId(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_id", msg)
        }
        JobServiceError::Domain(e @ DomainError::InvalidTransition { .. }) => {
            json_error(StatusCode::CONFLICT, "invalid_transition", e.to_string())
        }
        JobServiceError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", "Job not found"),
        JobServiceError::ShuttingDown => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "shutting_down",
            "job system is shutting down",
        ),
        JobServiceError::Store(e) => {
            tracing::error!(error = %e, "job store error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
