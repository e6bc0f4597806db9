//! Web server for the model library dashboard.
//!
//! Exposes the library, duplicate groups and background jobs as a JSON API:
//! - Library listing, per-file auto-tagging and manual edits
//! - Duplicate grouping by hash, name or size
//! - Library scan, auto-tag and bulk delete jobs with polling and cancellation

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::jobs::{BulkRunner, JobTracker};
use crate::repository::LibraryRepository;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub repo: LibraryRepository,
    pub tracker: Arc<JobTracker>,
    pub runner: BulkRunner,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        settings.ensure_directories()?;
        let repo = LibraryRepository::new(&settings.database_path())?;
        Ok(Self::with_repository(settings.clone(), repo))
    }

    /// Build state around an existing repository with a fresh tracker.
    pub fn with_repository(settings: Settings, repo: LibraryRepository) -> Self {
        let tracker = Arc::new(JobTracker::new());
        let runner = BulkRunner::new(tracker.clone(), settings.workers);
        Self {
            repo,
            tracker,
            runner,
            settings: Arc::new(settings),
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let state = AppState::new(settings).await?;
    let app = create_router(state);

    let addr: SocketAddr = bind.parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::analysis::geometry::tests::box_stl;
    use crate::models::{JobType, NewLibraryFile};

    fn setup_state() -> (AppState, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let settings = Settings::with_data_dir(dir.path().to_path_buf());
        settings.ensure_directories().unwrap();
        let repo = LibraryRepository::new(&settings.database_path()).unwrap();
        (AppState::with_repository(settings, repo), dir)
    }

    fn add_stl(state: &AppState, name: &str, dims: (f32, f32, f32)) -> i64 {
        let path: PathBuf = state.settings.library_dir.join(name);
        std::fs::write(&path, box_stl(dims.0, dims.1, dims.2)).unwrap();
        let new_file = NewLibraryFile::from_path(&path).unwrap().unwrap();
        state.repo.insert(&new_file).unwrap().id
    }

    async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn wait_for_idle(state: &AppState, job_type: JobType) {
        for _ in 0..200 {
            if !state.tracker.status(job_type).running {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{} job did not finish", job_type);
    }

    #[tokio::test]
    async fn test_list_library_empty() {
        let (state, _dir) = setup_state();
        let (status, json) = send(create_router(state), get("/api/library")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_get_file_not_found() {
        let (state, _dir) = setup_state();
        let (status, json) = send(create_router(state), get("/api/library/42")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("42"));
    }

    #[tokio::test]
    async fn test_auto_tag_single_file() {
        let (state, _dir) = setup_state();
        let id = add_stl(&state, "phone-stand.stl", (80.0, 60.0, 120.0));

        let (status, json) = send(
            create_router(state.clone()),
            Request::builder()
                .method("POST")
                .uri(format!("/api/library/{}/auto-tag", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        let tags: Vec<&str> = json["file"]["tags"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|t| t.as_str())
            .collect();
        assert!(tags.contains(&"functional"));
        assert_eq!(json["result"]["language"], "en");
    }

    #[tokio::test]
    async fn test_manual_tag_edit() {
        let (state, _dir) = setup_state();
        let id = add_stl(&state, "cube.stl", (10.0, 10.0, 10.0));

        let (status, json) = send(
            create_router(state),
            json_request(
                "PUT",
                &format!("/api/library/{}/tags", id),
                serde_json::json!({ "tags": [" calibration ", "calibration", ""] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["tags"], serde_json::json!(["calibration"]));
    }

    #[tokio::test]
    async fn test_duplicates_by_hash() {
        let (state, _dir) = setup_state();
        add_stl(&state, "a.stl", (10.0, 10.0, 10.0));
        add_stl(&state, "b.stl", (10.0, 10.0, 10.0));
        add_stl(&state, "c.stl", (20.0, 10.0, 10.0));

        let (status, json) = send(create_router(state), get("/api/library/duplicates")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["groupBy"], "hash");
        let groups = json["duplicates"].as_array().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0]["files"].as_array().unwrap().len(), 2);
        assert_eq!(groups[0]["reason"], "same content hash");
    }

    #[tokio::test]
    async fn test_duplicates_invalid_group_by() {
        let (state, _dir) = setup_state();
        let (status, _) = send(
            create_router(state),
            get("/api/library/duplicates?groupBy=color"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_status_idle_before_any_run() {
        let (state, _dir) = setup_state();
        let (status, json) = send(create_router(state), get("/api/library/auto-tag-status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["type"], "auto-tag");
        assert_eq!(json["running"], false);
        assert_eq!(json["total"], 0);
    }

    #[tokio::test]
    async fn test_bulk_delete_rejects_empty_selection() {
        let (state, _dir) = setup_state();
        let (status, _) = send(
            create_router(state),
            json_request(
                "POST",
                "/api/library/bulk-delete",
                serde_json::json!({ "fileIds": [] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bulk_delete_job_runs() {
        let (state, _dir) = setup_state();
        let first = add_stl(&state, "a.stl", (10.0, 10.0, 10.0));
        let second = add_stl(&state, "b.stl", (20.0, 10.0, 10.0));

        let (status, json) = send(
            create_router(state.clone()),
            json_request(
                "POST",
                "/api/library/bulk-delete",
                serde_json::json!({ "fileIds": [first, second, 999] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["accepted"], true);
        assert_eq!(json["status"]["total"], 3);

        wait_for_idle(&state, JobType::BulkDelete).await;
        let (_, json) = send(
            create_router(state.clone()),
            get("/api/jobs/bulk-delete/status"),
        )
        .await;
        assert_eq!(json["processed"], 3);
        assert_eq!(json["completedCount"], 2);
        assert_eq!(json["failedCount"], 1);
        assert_eq!(state.repo.count().unwrap(), 0);

        let (_, json) = send(
            create_router(state.clone()),
            get("/api/library/bulk-delete-status"),
        )
        .await;
        assert_eq!(json["running"], false);
        assert_eq!(json["deleted"], 2);
        assert_eq!(json["completed"], 2);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["completedCount"], 2);
    }

    #[tokio::test]
    async fn test_overlapping_job_is_rejected() {
        let (state, _dir) = setup_state();
        state.tracker.start(JobType::AutoTag, 5).unwrap();

        let (status, json) = send(
            create_router(state.clone()),
            Request::builder()
                .method("POST")
                .uri("/api/library/auto-tag-all")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["accepted"], false);
        assert_eq!(json["status"]["total"], 5);
        assert_eq!(json["status"]["running"], true);
    }

    #[tokio::test]
    async fn test_cancel_reports_whether_running() {
        let (state, _dir) = setup_state();
        let cancel = || {
            Request::builder()
                .method("POST")
                .uri("/api/library/scan-cancel")
                .body(Body::empty())
                .unwrap()
        };

        let (_, json) = send(create_router(state.clone()), cancel()).await;
        assert_eq!(json["cancelled"], false);

        state.tracker.start(JobType::LibraryScan, 3).unwrap();
        let (_, json) = send(create_router(state.clone()), cancel()).await;
        assert_eq!(json["cancelled"], true);
        assert!(state.tracker.is_cancel_requested(JobType::LibraryScan));
    }

    #[tokio::test]
    async fn test_scan_job_catalogues_library() {
        let (state, _dir) = setup_state();
        std::fs::write(
            state.settings.library_dir.join("vase.stl"),
            box_stl(60.0, 60.0, 180.0),
        )
        .unwrap();

        let (status, _) = send(
            create_router(state.clone()),
            Request::builder()
                .method("POST")
                .uri("/api/library/scan")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        wait_for_idle(&state, JobType::LibraryScan).await;
        let files = state.repo.get_all().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].tags.contains(&"decorative".to_string()));
    }

    #[tokio::test]
    async fn test_jobs_listing_and_unknown_type() {
        let (state, _dir) = setup_state();
        let (status, json) = send(create_router(state.clone()), get("/api/jobs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 4);

        let (status, _) = send(create_router(state), get("/api/jobs/render/status")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_geometry_endpoint() {
        let (state, _dir) = setup_state();
        let id = add_stl(&state, "block.stl", (30.0, 20.0, 10.0));

        let (status, json) = send(
            create_router(state),
            get(&format!("/api/library/geometry/{}", id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["triangleCount"], 2);
        assert_eq!(json["dimensions"], "30×20×10mm");
    }
}
