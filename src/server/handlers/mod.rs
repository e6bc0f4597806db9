//! HTTP request handlers for the web server.

mod duplicates;
mod helpers;
mod jobs;
mod library;

// Re-export handlers for use by the router
pub use duplicates::list_duplicates;
pub use jobs::{
    auto_tag_cancel, auto_tag_status, bulk_delete_cancel, bulk_delete_status, job_cancel,
    job_status, list_jobs, scan_cancel, scan_status, start_auto_tag_all, start_bulk_delete_job,
    start_scan,
};
pub use library::{
    auto_tag_one, geometry, get_file, list_files, print_settings, thumbnail, update_description,
    update_tags,
};
