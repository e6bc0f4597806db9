//! Data models for printdeck.

mod job;
mod library_file;

pub use job::{DashboardStatus, JobStatus, JobType};
pub use library_file::{FileType, LibraryFile, NewLibraryFile};
