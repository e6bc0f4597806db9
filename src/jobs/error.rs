//! Job error taxonomy.

use thiserror::Error;

use crate::models::JobType;

/// Errors from job tracking. Only `Conflict` is expected in normal use and
/// is surfaced to callers as a rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("A {0} job is already running")]
    Conflict(JobType),

    #[error("No {0} job is running")]
    NotRunning(JobType),

    #[error("{job_type} job already processed all {total} items")]
    Exhausted { job_type: JobType, total: u64 },
}

impl JobError {
    pub fn job_type(&self) -> JobType {
        match self {
            Self::Conflict(job_type) | Self::NotRunning(job_type) => *job_type,
            Self::Exhausted { job_type, .. } => *job_type,
        }
    }
}
