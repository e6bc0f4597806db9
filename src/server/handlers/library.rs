//! Library file endpoints.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::path::Path as FsPath;
use tokio::task;

use super::super::AppState;
use super::helpers::{error_response, service_error, with_repo};
use crate::analysis::{analyze_stl_geometry, parse_print_settings};
use crate::models::{FileType, LibraryFile};
use crate::repository::RepositoryError;
use crate::services::{auto_tag_file, thumbnail_bytes};

/// Body of a description edit.
#[derive(Debug, Deserialize)]
pub struct DescriptionRequest {
    pub description: Option<String>,
}

/// Body of a tag edit.
#[derive(Debug, Deserialize)]
pub struct TagsRequest {
    pub tags: Vec<String>,
}

/// Trim, drop empties and deduplicate user-supplied tags, keeping order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

async fn fetch_file(state: &AppState, id: i64) -> Result<LibraryFile, Response> {
    with_repo(state, move |repo| repo.get(id)?.ok_or(RepositoryError::NotFound(id))).await
}

/// List all library files, oldest first.
pub async fn list_files(State(state): State<AppState>) -> Response {
    match with_repo(&state, |repo| repo.get_all()).await {
        Ok(files) => Json(files).into_response(),
        Err(response) => response,
    }
}

pub async fn get_file(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match fetch_file(&state, id).await {
        Ok(file) => Json(file).into_response(),
        Err(response) => response,
    }
}

/// Describe and tag a single file synchronously.
pub async fn auto_tag_one(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let repo = state.repo.clone();
    match task::spawn_blocking(move || auto_tag_file(&repo, id)).await {
        Ok(Ok((file, result))) => Json(serde_json::json!({
            "success": true,
            "file": file,
            "result": result,
        }))
        .into_response(),
        Ok(Err(e)) => service_error(e),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn update_description(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<DescriptionRequest>,
) -> Response {
    let description = body
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    match with_repo(&state, move |repo| {
        repo.update_description(id, description.as_deref())
    })
    .await
    {
        Ok(file) => Json(file).into_response(),
        Err(response) => response,
    }
}

pub async fn update_tags(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<TagsRequest>,
) -> Response {
    let tags = normalize_tags(body.tags);
    match with_repo(&state, move |repo| repo.update_tags(id, &tags)).await {
        Ok(file) => Json(file).into_response(),
        Err(response) => response,
    }
}

/// PNG thumbnail of a file.
pub async fn thumbnail(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let file = match fetch_file(&state, id).await {
        Ok(file) => file,
        Err(response) => return response,
    };
    match task::spawn_blocking(move || thumbnail_bytes(&file)).await {
        Ok(Some(bytes)) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "No thumbnail available"),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Geometry profile of an STL file.
pub async fn geometry(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let file = match fetch_file(&state, id).await {
        Ok(file) => file,
        Err(response) => return response,
    };
    if file.file_type != FileType::Stl {
        return error_response(StatusCode::NOT_FOUND, "Geometry is only available for STL files");
    }
    match task::spawn_blocking(move || analyze_stl_geometry(FsPath::new(&file.file_path))).await {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Could not parse STL geometry"),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Slicer settings embedded in a 3MF file.
pub async fn print_settings(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let file = match fetch_file(&state, id).await {
        Ok(file) => file,
        Err(response) => return response,
    };
    if file.file_type != FileType::ThreeMf {
        return error_response(
            StatusCode::NOT_FOUND,
            "Print settings are only available for 3MF files",
        );
    }
    match task::spawn_blocking(move || parse_print_settings(FsPath::new(&file.file_path))).await {
        Ok(Ok(settings)) => Json(settings).into_response(),
        Ok(Err(e)) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
