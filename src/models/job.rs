//! Background job models shared by the tracker and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Long-running background operation kinds. At most one run per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    VideoMatch,
    LibraryScan,
    AutoTag,
    BulkDelete,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::VideoMatch,
        JobType::LibraryScan,
        JobType::AutoTag,
        JobType::BulkDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VideoMatch => "video-match",
            Self::LibraryScan => "library-scan",
            Self::AutoTag => "auto-tag",
            Self::BulkDelete => "bulk-delete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "video-match" => Some(Self::VideoMatch),
            "library-scan" => Some(Self::LibraryScan),
            "auto-tag" => Some(Self::AutoTag),
            "bulk-delete" => Some(Self::BulkDelete),
            _ => None,
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time snapshot of a job, as polled by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub running: bool,
    /// Cancellation was requested and the runner has not finalized yet.
    pub cancel_requested: bool,
    pub total: u64,
    pub processed: u64,
    pub completed_count: u64,
    pub failed_count: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Whole seconds since `started_at` (frozen at `finished_at`).
    pub elapsed_time: u64,
}

impl JobStatus {
    /// Status of a job type that has never run.
    pub fn idle(job_type: JobType) -> Self {
        Self {
            job_type,
            running: false,
            cancel_requested: false,
            total: 0,
            processed: 0,
            completed_count: 0,
            failed_count: 0,
            started_at: None,
            finished_at: None,
            elapsed_time: 0,
        }
    }
}

/// Status as served on the `/api/library/*-status` routes.
///
/// The dashboard reads the older per-job counter names, so they are sent
/// next to the camelCase fields: `completed`/`failed` always, plus `added`
/// for library scans and `deleted` for bulk deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStatus {
    #[serde(flatten)]
    pub status: JobStatus,
    pub completed: u64,
    pub failed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<u64>,
}

impl From<JobStatus> for DashboardStatus {
    fn from(status: JobStatus) -> Self {
        let completed = status.completed_count;
        Self {
            completed,
            failed: status.failed_count,
            added: (status.job_type == JobType::LibraryScan).then_some(completed),
            deleted: (status.job_type == JobType::BulkDelete).then_some(completed),
            status,
        }
    }
}
