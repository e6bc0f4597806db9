//! Bounded worker pool that drives one tracked bulk job.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{error, warn};

use super::{JobError, JobTracker};
use crate::models::{JobStatus, JobType};

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: u64,
    pub completed: u64,
    pub failed: u64,
    /// The run stopped early because cancellation was requested.
    pub cancelled: bool,
    /// The run stopped early because progress could not be recorded.
    pub aborted: bool,
}

/// Runs per-item work for a job type across a fixed number of workers.
#[derive(Debug, Clone)]
pub struct BulkRunner {
    tracker: Arc<JobTracker>,
    workers: usize,
}

impl BulkRunner {
    pub fn new(tracker: Arc<JobTracker>, workers: usize) -> Self {
        Self {
            tracker,
            workers: workers.max(1),
        }
    }

    pub fn tracker(&self) -> &Arc<JobTracker> {
        &self.tracker
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Start a job in the background and return its handle.
    ///
    /// The tracker slot is claimed before this returns, so a conflicting
    /// run is rejected immediately rather than from inside the task.
    pub fn spawn<T, F, Fut, E>(
        &self,
        job_type: JobType,
        targets: Vec<T>,
        per_item: F,
    ) -> Result<(JobStatus, JoinHandle<RunSummary>), JobError>
    where
        T: fmt::Debug + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let status = self.tracker.start(job_type, targets.len() as u64)?;
        let handle = tokio::spawn(drive(
            self.tracker.clone(),
            self.workers,
            job_type,
            targets,
            per_item,
        ));
        Ok((status, handle))
    }

    /// Run a job to completion.
    pub async fn run<T, F, Fut, E>(
        &self,
        job_type: JobType,
        targets: Vec<T>,
        per_item: F,
    ) -> Result<RunSummary, JobError>
    where
        T: fmt::Debug + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.tracker.start(job_type, targets.len() as u64)?;
        Ok(drive(self.tracker.clone(), self.workers, job_type, targets, per_item).await)
    }
}

async fn drive<T, F, Fut, E>(
    tracker: Arc<JobTracker>,
    workers: usize,
    job_type: JobType,
    targets: Vec<T>,
    per_item: F,
) -> RunSummary
where
    T: fmt::Debug + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let worker_count = workers.min(targets.len());
    let queue = Arc::new(Mutex::new(VecDeque::from(targets)));
    let per_item = Arc::new(per_item);
    let aborted = Arc::new(AtomicBool::new(false));

    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let tracker = tracker.clone();
        let queue = queue.clone();
        let per_item = per_item.clone();
        let aborted = aborted.clone();

        handles.push(tokio::spawn(async move {
            loop {
                if tracker.is_cancel_requested(job_type) || aborted.load(Ordering::SeqCst) {
                    break;
                }

                let next = queue
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop_front();
                let Some(item) = next else {
                    break;
                };

                let label = format!("{:?}", item);
                let success = match tokio::spawn((*per_item)(item)).await {
                    Ok(Ok(())) => true,
                    Ok(Err(e)) => {
                        warn!("{} item {} failed: {}", job_type, label, e);
                        false
                    }
                    Err(e) => {
                        warn!("{} item {} panicked: {}", job_type, label, e);
                        false
                    }
                };

                if let Err(e) = tracker.advance(job_type, success) {
                    error!("Aborting {} job: {}", job_type, e);
                    aborted.store(true, Ordering::SeqCst);
                    break;
                }
            }
        }));
    }

    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            error!("{} worker failed: {}", job_type, e);
            aborted.store(true, Ordering::SeqCst);
        }
    }

    let cancel_requested = tracker.is_cancel_requested(job_type);
    tracker.finish(job_type);

    let status = tracker.status(job_type);
    RunSummary {
        processed: status.processed,
        completed: status.completed_count,
        failed: status.failed_count,
        // A cancel that lands after the last item changes nothing.
        cancelled: cancel_requested && status.processed < status.total,
        aborted: aborted.load(Ordering::SeqCst),
    }
}
