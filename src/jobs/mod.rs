//! Tracked, cancellable background jobs.
//!
//! [`JobTracker`] holds per-type progress that the dashboard polls;
//! [`BulkRunner`] feeds a target list through per-item work while keeping
//! the tracker up to date.

mod error;
mod runner;
mod tracker;

pub use error::JobError;
pub use runner::{BulkRunner, RunSummary};
pub use tracker::JobTracker;
