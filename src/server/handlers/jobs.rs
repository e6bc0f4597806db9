//! Background job endpoints: start, status and cancel.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::super::AppState;
use super::helpers::{error_response, start_job};
use crate::models::{DashboardStatus, JobType};
use crate::services::{start_auto_tag, start_bulk_delete, start_library_scan, AutoTagSelection};

/// Body of an auto-tag-all request. All fields are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoTagAllRequest {
    #[serde(default, alias = "fileIds")]
    pub ids: Option<Vec<i64>>,
    #[serde(default)]
    pub only_untagged: bool,
}

impl AutoTagAllRequest {
    fn selection(self) -> AutoTagSelection {
        match self.ids {
            Some(ids) => AutoTagSelection::Ids(ids),
            None if self.only_untagged => AutoTagSelection::Untagged,
            None => AutoTagSelection::All,
        }
    }
}

/// Body of a bulk delete request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRequest {
    pub file_ids: Vec<i64>,
}

/// Start scanning the library directory.
pub async fn start_scan(State(state): State<AppState>) -> Response {
    let runner = state.runner.clone();
    let repo = state.repo.clone();
    let dir = state.settings.library_dir.clone();
    let describe = state.settings.auto_describe_on_scan;
    start_job(&state, move || {
        start_library_scan(&runner, &repo, &dir, describe)
    })
    .await
}

/// Start describing and tagging library files.
pub async fn start_auto_tag_all(
    State(state): State<AppState>,
    body: Option<Json<AutoTagAllRequest>>,
) -> Response {
    let selection = body.map(|Json(b)| b).unwrap_or_default().selection();
    let runner = state.runner.clone();
    let repo = state.repo.clone();
    start_job(&state, move || start_auto_tag(&runner, &repo, &selection)).await
}

/// Start deleting the selected files.
pub async fn start_bulk_delete_job(
    State(state): State<AppState>,
    Json(body): Json<BulkDeleteRequest>,
) -> Response {
    let runner = state.runner.clone();
    let repo = state.repo.clone();
    start_job(&state, move || start_bulk_delete(&runner, &repo, body.file_ids)).await
}

fn status_of(state: &AppState, job_type: JobType) -> Response {
    Json(state.tracker.status(job_type)).into_response()
}

fn dashboard_status_of(state: &AppState, job_type: JobType) -> Response {
    Json(DashboardStatus::from(state.tracker.status(job_type))).into_response()
}

fn cancel_of(state: &AppState, job_type: JobType) -> Response {
    let cancelled = state.tracker.cancel(job_type);
    Json(serde_json::json!({ "success": true, "cancelled": cancelled })).into_response()
}

pub async fn scan_status(State(state): State<AppState>) -> Response {
    dashboard_status_of(&state, JobType::LibraryScan)
}

pub async fn scan_cancel(State(state): State<AppState>) -> Response {
    cancel_of(&state, JobType::LibraryScan)
}

pub async fn auto_tag_status(State(state): State<AppState>) -> Response {
    dashboard_status_of(&state, JobType::AutoTag)
}

pub async fn auto_tag_cancel(State(state): State<AppState>) -> Response {
    cancel_of(&state, JobType::AutoTag)
}

pub async fn bulk_delete_status(State(state): State<AppState>) -> Response {
    dashboard_status_of(&state, JobType::BulkDelete)
}

pub async fn bulk_delete_cancel(State(state): State<AppState>) -> Response {
    cancel_of(&state, JobType::BulkDelete)
}

/// All job statuses.
pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.tracker.all_statuses())
}

fn parse_job_type(name: &str) -> Result<JobType, Response> {
    JobType::from_str(name).ok_or_else(|| {
        error_response(StatusCode::NOT_FOUND, format!("Unknown job type: {}", name))
    })
}

/// Status of a job by type name.
pub async fn job_status(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match parse_job_type(&name) {
        Ok(job_type) => status_of(&state, job_type),
        Err(response) => response,
    }
}

/// Cancel a job by type name.
pub async fn job_cancel(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match parse_job_type(&name) {
        Ok(job_type) => cancel_of(&state, job_type),
        Err(response) => response,
    }
}
