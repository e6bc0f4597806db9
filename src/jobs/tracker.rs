//! In-memory progress tracking for background jobs.
//!
//! One slot per job type. Counters live behind a short-held `RwLock` so
//! status polls never wait on item processing, and the cancel flag is a
//! separate atomic that workers check between items.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

use super::JobError;
use crate::models::{JobStatus, JobType};

#[derive(Debug, Default)]
struct JobState {
    running: bool,
    total: u64,
    processed: u64,
    completed: u64,
    failed: u64,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct JobSlot {
    state: RwLock<JobState>,
    cancel_requested: AtomicBool,
}

impl JobSlot {
    fn read(&self) -> RwLockReadGuard<'_, JobState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, JobState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Process-wide job tracker. Construct once and share via `Arc`.
#[derive(Debug)]
pub struct JobTracker {
    slots: HashMap<JobType, JobSlot>,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTracker {
    pub fn new() -> Self {
        Self {
            slots: JobType::ALL
                .into_iter()
                .map(|job_type| (job_type, JobSlot::default()))
                .collect(),
        }
    }

    fn slot(&self, job_type: JobType) -> &JobSlot {
        // Every job type gets a slot in `new`.
        &self.slots[&job_type]
    }

    /// Begin a run of `total` items. Fails if a run of this type is active.
    pub fn start(&self, job_type: JobType, total: u64) -> Result<JobStatus, JobError> {
        let slot = self.slot(job_type);
        {
            let mut state = slot.write();
            if state.running {
                return Err(JobError::Conflict(job_type));
            }
            *state = JobState {
                running: true,
                total,
                started_at: Some(Utc::now()),
                ..JobState::default()
            };
            slot.cancel_requested.store(false, Ordering::SeqCst);
        }
        info!("Started {} job with {} items", job_type, total);
        Ok(self.status(job_type))
    }

    /// Record one processed item.
    pub fn advance(&self, job_type: JobType, success: bool) -> Result<(), JobError> {
        let mut state = self.slot(job_type).write();
        if !state.running {
            return Err(JobError::NotRunning(job_type));
        }
        if state.processed >= state.total {
            return Err(JobError::Exhausted {
                job_type,
                total: state.total,
            });
        }
        state.processed += 1;
        if success {
            state.completed += 1;
        } else {
            state.failed += 1;
        }
        Ok(())
    }

    /// Ask a running job to stop. Returns false when nothing is running.
    ///
    /// The job keeps `running = true` until its runner observes the flag
    /// and calls [`finish`](Self::finish).
    pub fn cancel(&self, job_type: JobType) -> bool {
        let slot = self.slot(job_type);
        // Hold the read guard across the store so `finish`/`start` cannot
        // swap in a new run between the check and the flag.
        let state = slot.read();
        if !state.running {
            return false;
        }
        slot.cancel_requested.store(true, Ordering::SeqCst);
        drop(state);
        info!("Cancellation requested for {} job", job_type);
        true
    }

    /// Whether cancellation was requested for the current run.
    pub fn is_cancel_requested(&self, job_type: JobType) -> bool {
        self.slot(job_type).cancel_requested.load(Ordering::SeqCst)
    }

    /// Mark the run finished, keeping its final counters.
    pub fn finish(&self, job_type: JobType) {
        let slot = self.slot(job_type);
        let (processed, total) = {
            let mut state = slot.write();
            if !state.running {
                return;
            }
            state.running = false;
            state.finished_at = Some(Utc::now());
            slot.cancel_requested.store(false, Ordering::SeqCst);
            (state.processed, state.total)
        };
        info!("Finished {} job: {}/{} processed", job_type, processed, total);
    }

    /// Snapshot of one job type. Never fails, even if it never ran.
    pub fn status(&self, job_type: JobType) -> JobStatus {
        let slot = self.slot(job_type);
        let state = slot.read();
        let Some(started_at) = state.started_at else {
            return JobStatus::idle(job_type);
        };
        let until = state.finished_at.unwrap_or_else(Utc::now);
        JobStatus {
            job_type,
            running: state.running,
            cancel_requested: state.running && slot.cancel_requested.load(Ordering::SeqCst),
            total: state.total,
            processed: state.processed,
            completed_count: state.completed,
            failed_count: state.failed,
            started_at: Some(started_at),
            finished_at: state.finished_at,
            elapsed_time: (until - started_at).num_seconds().max(0) as u64,
        }
    }

    /// Snapshots of every job type, in declaration order.
    pub fn all_statuses(&self) -> Vec<JobStatus> {
        JobType::ALL.into_iter().map(|t| self.status(t)).collect()
    }
}
