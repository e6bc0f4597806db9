//! Library scan command.

use std::path::PathBuf;
use std::sync::Arc;

use console::style;

use crate::config::Settings;
use crate::jobs::{BulkRunner, JobTracker};
use crate::models::JobType;
use crate::services::{scan_targets, start_library_scan};

use super::super::helpers::{follow_job, open_repository};

/// Catalogue new model files below `dir` (default: the library directory).
pub async fn cmd_scan(
    settings: &Settings,
    dir: Option<PathBuf>,
    no_describe: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let repo = open_repository(settings)?;
    let dir = dir.unwrap_or_else(|| settings.library_dir.clone());

    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }

    if dry_run {
        let targets = scan_targets(&repo, &dir)?;
        println!(
            "{} {} new model files in {}",
            style("→").cyan(),
            targets.len(),
            dir.display()
        );
        for path in targets {
            println!("  {}", path.display());
        }
        return Ok(());
    }

    let tracker = Arc::new(JobTracker::new());
    let runner = BulkRunner::new(tracker.clone(), settings.workers);
    let describe = settings.auto_describe_on_scan && !no_describe;

    let started = start_library_scan(&runner, &repo, &dir, describe)?;
    if started.0.total == 0 {
        println!("{} No new model files in {}", style("✓").green(), dir.display());
        started.1.await?;
        return Ok(());
    }

    follow_job(&tracker, JobType::LibraryScan, started, "Scanning library...").await?;
    println!(
        "  {} files in library",
        style(repo.count()?).bold()
    );
    Ok(())
}
