//! Bulk auto-tag command.

use std::sync::Arc;

use console::style;

use crate::config::Settings;
use crate::jobs::{BulkRunner, JobTracker};
use crate::models::JobType;
use crate::services::{start_auto_tag, AutoTagSelection};

use super::super::helpers::{follow_job, open_repository};

/// Describe and tag library files.
pub async fn cmd_auto_tag(
    settings: &Settings,
    ids: Vec<i64>,
    untagged: bool,
) -> anyhow::Result<()> {
    let repo = open_repository(settings)?;
    let selection = if !ids.is_empty() {
        AutoTagSelection::Ids(ids)
    } else if untagged {
        AutoTagSelection::Untagged
    } else {
        AutoTagSelection::All
    };

    let tracker = Arc::new(JobTracker::new());
    let runner = BulkRunner::new(tracker.clone(), settings.workers);

    let started = start_auto_tag(&runner, &repo, &selection)?;
    if started.0.total == 0 {
        println!("{} Nothing to tag", style("!").yellow());
        started.1.await?;
        return Ok(());
    }

    follow_job(&tracker, JobType::AutoTag, started, "Tagging models...").await?;
    Ok(())
}
