//! Service layer for printdeck business logic.
//!
//! Domain operations shared by the CLI and the web server.

pub mod library;

pub use library::{
    auto_tag_file, auto_tag_targets, delete_library_file, discover_model_files, ingest_path,
    scan_targets, start_auto_tag, start_bulk_delete, start_library_scan, thumbnail_bytes,
    AutoTagSelection, StartJobError, StartedJob,
};
