//! Router configuration for the web server.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Library files
        .route("/api/library", get(handlers::list_files))
        .route("/api/library/duplicates", get(handlers::list_duplicates))
        .route("/api/library/thumbnail/:id", get(handlers::thumbnail))
        .route("/api/library/geometry/:id", get(handlers::geometry))
        .route("/api/library/:id", get(handlers::get_file))
        .route("/api/library/:id/auto-tag", post(handlers::auto_tag_one))
        .route(
            "/api/library/:id/description",
            put(handlers::update_description),
        )
        .route("/api/library/:id/tags", put(handlers::update_tags))
        .route(
            "/api/library/:id/print-settings",
            get(handlers::print_settings),
        )
        // Library scan
        .route("/api/library/scan", post(handlers::start_scan))
        .route("/api/library/scan-status", get(handlers::scan_status))
        .route("/api/library/scan-cancel", post(handlers::scan_cancel))
        // Auto-tag
        .route(
            "/api/library/auto-tag-all",
            post(handlers::start_auto_tag_all),
        )
        .route(
            "/api/library/auto-tag-status",
            get(handlers::auto_tag_status),
        )
        .route(
            "/api/library/auto-tag-cancel",
            post(handlers::auto_tag_cancel),
        )
        // Bulk delete
        .route(
            "/api/library/bulk-delete",
            post(handlers::start_bulk_delete_job),
        )
        .route(
            "/api/library/bulk-delete-status",
            get(handlers::bulk_delete_status),
        )
        .route(
            "/api/library/bulk-delete-cancel",
            post(handlers::bulk_delete_cancel),
        )
        // Generic job API
        .route("/api/jobs", get(handlers::list_jobs))
        .route("/api/jobs/:job_type/status", get(handlers::job_status))
        .route("/api/jobs/:job_type/cancel", post(handlers::job_cancel))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
