//! Shared response and blocking helpers for handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tokio::task;

use super::super::AppState;
use crate::jobs::JobError;
use crate::repository::{LibraryRepository, RepositoryError};
use crate::services::{StartJobError, StartedJob};

/// JSON `{ "error": message }` with the given status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

/// Map a repository failure to 404 or 500.
pub fn repository_error(e: RepositoryError) -> Response {
    match e {
        RepositoryError::NotFound(id) => {
            error_response(StatusCode::NOT_FOUND, format!("Library file {} not found", id))
        }
        other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

/// Map a per-file service failure, keeping 404 for unknown IDs.
pub fn service_error(e: anyhow::Error) -> Response {
    match e.downcast::<RepositoryError>() {
        Ok(repo_err) => repository_error(repo_err),
        Err(other) => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

/// Run a synchronous repository call on the blocking pool.
pub async fn with_repo<T, F>(state: &AppState, work: F) -> Result<T, Response>
where
    F: FnOnce(&LibraryRepository) -> Result<T, RepositoryError> + Send + 'static,
    T: Send + 'static,
{
    let repo = state.repo.clone();
    match task::spawn_blocking(move || work(&repo)).await {
        Ok(result) => result.map_err(repository_error),
        Err(e) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.to_string(),
        )),
    }
}

/// Response for a bulk job start request.
///
/// Overlapping runs are rejected with 409 and the current status so the
/// dashboard can keep polling the run that is already active.
pub fn start_response(state: &AppState, result: Result<StartedJob, StartJobError>) -> Response {
    match result {
        Ok((status, _handle)) => Json(serde_json::json!({
            "success": true,
            "accepted": true,
            "status": status,
        }))
        .into_response(),
        Err(StartJobError::Job(JobError::Conflict(job_type))) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "success": false,
                "accepted": false,
                "message": JobError::Conflict(job_type).to_string(),
                "status": state.tracker.status(job_type),
            })),
        )
            .into_response(),
        Err(StartJobError::EmptySelection) => {
            error_response(StatusCode::BAD_REQUEST, StartJobError::EmptySelection.to_string())
        }
        Err(StartJobError::Repository(e)) => repository_error(e),
        Err(StartJobError::Job(e)) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Run a job starter on the blocking pool (starters read the store).
pub async fn start_job<F>(state: &AppState, starter: F) -> Response
where
    F: FnOnce() -> Result<StartedJob, StartJobError> + Send + 'static,
{
    match task::spawn_blocking(starter).await {
        Ok(result) => start_response(state, result),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
