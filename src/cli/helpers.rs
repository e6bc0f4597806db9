//! Shared helper functions for CLI commands.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::jobs::{JobTracker, RunSummary};
use crate::models::JobType;
use crate::repository::LibraryRepository;
use crate::services::StartedJob;
use crate::utils::format_duration;

/// Open the library database, creating directories and schema as needed.
pub fn open_repository(settings: &Settings) -> anyhow::Result<LibraryRepository> {
    settings.ensure_directories()?;
    Ok(LibraryRepository::new(&settings.database_path())?)
}

/// Truncate a string to at most `max` characters, adding an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render a started job's progress until it finishes.
///
/// Ctrl+C requests cancellation; the bar keeps updating until the workers
/// drain.
pub async fn follow_job(
    tracker: &JobTracker,
    job_type: JobType,
    started: StartedJob,
    message: &str,
) -> anyhow::Result<RunSummary> {
    let (status, mut handle) = started;

    let progress = ProgressBar::new(status.total);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")?
            .progress_chars("█▓░"),
    );
    progress.set_message(message.to_string());
    progress.enable_steady_tick(Duration::from_millis(120));

    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let mut interrupted = false;

    let summary = loop {
        tokio::select! {
            result = &mut handle => break result?,
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                tracker.cancel(job_type);
                progress.set_message("Cancelling...");
            }
            _ = ticker.tick() => {
                let current = tracker.status(job_type);
                progress.set_length(current.total);
                progress.set_position(current.processed);
            }
        }
    };

    let finished = tracker.status(job_type);
    progress.set_position(finished.processed);
    progress.finish_and_clear();

    let elapsed = format_duration(finished.elapsed_time);
    if summary.cancelled {
        println!(
            "{} Cancelled after {} of {} ({})",
            style("!").yellow(),
            summary.processed,
            finished.total,
            elapsed
        );
    } else {
        println!(
            "{} {} processed in {}",
            style("✓").green(),
            summary.processed,
            elapsed
        );
    }
    if summary.failed > 0 {
        println!(
            "  {} {} failed (run with -v for details)",
            style("✗").red(),
            summary.failed
        );
    }

    Ok(summary)
}
