//! Duplicate model detection handler.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::super::AppState;
use super::helpers::{error_response, with_repo};
use crate::duplicates::{group_duplicates, GroupBy};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicatesQuery {
    pub group_by: Option<String>,
}

/// Group library files by hash, name or size.
pub async fn list_duplicates(
    State(state): State<AppState>,
    Query(query): Query<DuplicatesQuery>,
) -> Response {
    let group_by = match query.group_by.as_deref() {
        None | Some("") => GroupBy::default(),
        Some(raw) => match GroupBy::from_str(raw) {
            Some(g) => g,
            None => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid groupBy: {} (expected hash, name or size)", raw),
                )
            }
        },
    };

    let files = match with_repo(&state, |repo| repo.get_all()).await {
        Ok(files) => files,
        Err(response) => return response,
    };

    Json(serde_json::json!({
        "duplicates": group_duplicates(&files, group_by),
        "groupBy": group_by,
    }))
    .into_response()
}
