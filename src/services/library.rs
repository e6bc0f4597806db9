//! Library operations run per file by bulk jobs, CLI and HTTP handlers.
//!
//! The per-file functions are synchronous (SQLite and file I/O); job
//! starters wrap them in `spawn_blocking` and hand them to [`BulkRunner`].

use anyhow::Context;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::task::{self, JoinHandle};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::analysis::{describe_model, extract_3mf_thumbnail, DescribeResult};
use crate::jobs::{BulkRunner, JobError, RunSummary};
use crate::models::{FileType, JobStatus, JobType, LibraryFile, NewLibraryFile};
use crate::repository::{LibraryRepository, RepositoryError};

/// Reasons a bulk job could not be started.
#[derive(Debug, Error)]
pub enum StartJobError {
    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("No files selected")]
    EmptySelection,
}

/// Files targeted by an auto-tag run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoTagSelection {
    All,
    Untagged,
    Ids(Vec<i64>),
}

/// A started background job.
pub type StartedJob = (JobStatus, JoinHandle<RunSummary>);

fn load_file(repo: &LibraryRepository, id: i64) -> anyhow::Result<LibraryFile> {
    repo.get(id)?
        .ok_or_else(|| RepositoryError::NotFound(id).into())
}

/// Describe one catalogued file and store its description and tags.
pub fn auto_tag_file(
    repo: &LibraryRepository,
    id: i64,
) -> anyhow::Result<(LibraryFile, DescribeResult)> {
    let file = load_file(repo, id)?;
    let result = describe_model(Path::new(&file.file_path), file.display_name());
    let updated = repo.update_description_and_tags(id, &result.description, &result.tags)?;
    debug!("Auto-tagged {}: {}", updated.display_name(), result.tags.join(", "));
    Ok((updated, result))
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Delete a catalogued file from the store and from disk.
///
/// The record goes first so it never points at a removed file. A file
/// already missing from disk is not an error. If removing it fails the
/// record is gone and the next scan catalogues the file again.
pub fn delete_library_file(repo: &LibraryRepository, id: i64) -> anyhow::Result<()> {
    let file = load_file(repo, id)?;
    if !repo.delete(id)? {
        return Err(RepositoryError::NotFound(id).into());
    }
    remove_if_present(Path::new(&file.file_path))
        .with_context(|| format!("Failed to delete {}", file.file_path))?;
    if let Some(ref thumbnail) = file.thumbnail_path {
        remove_if_present(Path::new(thumbnail))
            .with_context(|| format!("Failed to delete thumbnail {}", thumbnail))?;
    }
    debug!("Deleted library file {} ({})", id, file.file_path);
    Ok(())
}

/// Find model files (.3mf, .stl, .gcode) below `dir`, sorted by path.
pub fn discover_model_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && FileType::from_path(e.path()).is_some())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Model files below `dir` that are not catalogued yet.
pub fn scan_targets(repo: &LibraryRepository, dir: &Path) -> Result<Vec<PathBuf>, RepositoryError> {
    let mut targets = Vec::new();
    for path in discover_model_files(dir) {
        if repo.find_by_path(&path.display().to_string())?.is_none() {
            targets.push(path);
        }
    }
    Ok(targets)
}

/// Catalogue a single file, optionally describing it.
///
/// Returns `None` when the file is already catalogued or is not a model.
pub fn ingest_path(
    repo: &LibraryRepository,
    path: &Path,
    describe: bool,
) -> anyhow::Result<Option<LibraryFile>> {
    if repo.find_by_path(&path.display().to_string())?.is_some() {
        return Ok(None);
    }
    let Some(new_file) = NewLibraryFile::from_path(path)
        .with_context(|| format!("Failed to read {}", path.display()))?
    else {
        return Ok(None);
    };

    let stored = repo.insert(&new_file)?;
    if !describe {
        return Ok(Some(stored));
    }
    let (described, _) = auto_tag_file(repo, stored.id)?;
    Ok(Some(described))
}

/// Resolve an auto-tag selection to file IDs, oldest first.
pub fn auto_tag_targets(
    repo: &LibraryRepository,
    selection: &AutoTagSelection,
) -> Result<Vec<i64>, RepositoryError> {
    let files = match selection {
        AutoTagSelection::All => repo.get_all()?,
        AutoTagSelection::Untagged => repo
            .get_all()?
            .into_iter()
            .filter(|f| f.tags.is_empty())
            .collect(),
        AutoTagSelection::Ids(ids) => repo.get_many(ids)?,
    };
    Ok(files.into_iter().map(|f| f.id).collect())
}

/// Run synchronous per-item work off the async executor.
async fn blocking<F>(work: F) -> anyhow::Result<()>
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
{
    task::spawn_blocking(work).await?
}

/// Start a background scan of `dir`.
pub fn start_library_scan(
    runner: &BulkRunner,
    repo: &LibraryRepository,
    dir: &Path,
    describe: bool,
) -> Result<StartedJob, StartJobError> {
    let targets = scan_targets(repo, dir)?;
    info!("Scanning {}: {} new files", dir.display(), targets.len());
    let repo = repo.clone();
    let started = runner.spawn(JobType::LibraryScan, targets, move |path: PathBuf| {
        let repo = repo.clone();
        async move {
            blocking(move || ingest_path(&repo, &path, describe).map(|_| ())).await
        }
    })?;
    Ok(started)
}

/// Start a background auto-tag run.
pub fn start_auto_tag(
    runner: &BulkRunner,
    repo: &LibraryRepository,
    selection: &AutoTagSelection,
) -> Result<StartedJob, StartJobError> {
    let targets = auto_tag_targets(repo, selection)?;
    let repo = repo.clone();
    let started = runner.spawn(JobType::AutoTag, targets, move |id: i64| {
        let repo = repo.clone();
        async move { blocking(move || auto_tag_file(&repo, id).map(|_| ())).await }
    })?;
    Ok(started)
}

/// Start a background bulk delete of the given IDs.
pub fn start_bulk_delete(
    runner: &BulkRunner,
    repo: &LibraryRepository,
    ids: Vec<i64>,
) -> Result<StartedJob, StartJobError> {
    if ids.is_empty() {
        return Err(StartJobError::EmptySelection);
    }
    let repo = repo.clone();
    let started = runner.spawn(JobType::BulkDelete, ids, move |id: i64| {
        let repo = repo.clone();
        async move { blocking(move || delete_library_file(&repo, id)).await }
    })?;
    Ok(started)
}

/// PNG thumbnail for a file: the stored thumbnail if readable, otherwise
/// the first plate image embedded in a 3MF.
pub fn thumbnail_bytes(file: &LibraryFile) -> Option<Vec<u8>> {
    if let Some(ref path) = file.thumbnail_path {
        if let Ok(bytes) = std::fs::read(path) {
            return Some(bytes);
        }
    }
    match file.file_type {
        FileType::ThreeMf => extract_3mf_thumbnail(Path::new(&file.file_path)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::geometry::tests::box_stl;
    use crate::jobs::JobTracker;
    use std::sync::Arc;

    fn setup() -> (tempfile::TempDir, LibraryRepository, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let repo = LibraryRepository::new(&dir.path().join("printdeck.db")).unwrap();
        let library = dir.path().join("library");
        std::fs::create_dir_all(library.join("nested")).unwrap();
        (dir, repo, library)
    }

    #[test]
    fn test_discover_and_ingest() {
        let (_dir, repo, library) = setup();
        std::fs::write(library.join("hook.stl"), box_stl(20.0, 20.0, 20.0)).unwrap();
        std::fs::write(library.join("nested/plate.GCODE"), b"G28").unwrap();
        std::fs::write(library.join("notes.txt"), b"ignore").unwrap();

        let found = discover_model_files(&library);
        assert_eq!(found.len(), 2);

        let stored = ingest_path(&repo, &library.join("hook.stl"), true)
            .unwrap()
            .unwrap();
        assert!(stored.tags.contains(&"functional".to_string()));
        assert!(stored.tags.contains(&"miniature".to_string()));
        assert!(stored.description.is_some());

        // Already catalogued.
        assert!(ingest_path(&repo, &library.join("hook.stl"), true)
            .unwrap()
            .is_none());
        assert_eq!(scan_targets(&repo, &library).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_missing_file_on_disk_succeeds() {
        let (_dir, repo, library) = setup();
        let path = library.join("gone.stl");
        std::fs::write(&path, b"x").unwrap();
        let stored = ingest_path(&repo, &path, false).unwrap().unwrap();
        std::fs::remove_file(&path).unwrap();

        delete_library_file(&repo, stored.id).unwrap();
        assert!(repo.get(stored.id).unwrap().is_none());
        assert!(delete_library_file(&repo, stored.id).is_err());
    }

    #[test]
    fn test_delete_removes_record_even_when_disk_removal_fails() {
        let (_dir, repo, library) = setup();
        let path = library.join("stuck.stl");
        std::fs::write(&path, b"x").unwrap();
        let stored = ingest_path(&repo, &path, false).unwrap().unwrap();
        // A directory in its place cannot be removed with remove_file.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(delete_library_file(&repo, stored.id).is_err());
        assert!(repo.get(stored.id).unwrap().is_none());
    }

    #[test]
    fn test_auto_tag_targets() {
        let (_dir, repo, library) = setup();
        for name in ["a.stl", "b.stl", "c.stl"] {
            std::fs::write(library.join(name), name.as_bytes()).unwrap();
        }
        let ids: Vec<i64> = discover_model_files(&library)
            .iter()
            .map(|p| ingest_path(&repo, p, false).unwrap().unwrap().id)
            .collect();
        repo.update_tags(ids[1], &["tagged".to_string()]).unwrap();

        assert_eq!(auto_tag_targets(&repo, &AutoTagSelection::All).unwrap(), ids);
        assert_eq!(
            auto_tag_targets(&repo, &AutoTagSelection::Untagged).unwrap(),
            vec![ids[0], ids[2]]
        );
        assert_eq!(
            auto_tag_targets(&repo, &AutoTagSelection::Ids(vec![ids[2], 999])).unwrap(),
            vec![ids[2]]
        );
    }

    #[tokio::test]
    async fn test_bulk_delete_job_counts_failures() {
        let (_dir, repo, library) = setup();
        let mut ids = Vec::new();
        for n in 0..7 {
            let path = library.join(format!("part{n}.stl"));
            std::fs::write(&path, format!("{n}")).unwrap();
            ids.push(ingest_path(&repo, &path, false).unwrap().unwrap().id);
        }
        ids.extend([9001, 9002, 9003]);

        let runner = BulkRunner::new(Arc::new(JobTracker::new()), 3);
        let (status, handle) = start_bulk_delete(&runner, &repo, ids).unwrap();
        assert!(status.running);
        let summary = handle.await.unwrap();

        assert_eq!(
            (summary.processed, summary.completed, summary.failed),
            (10, 7, 3)
        );
        assert_eq!(repo.count().unwrap(), 0);
        assert!(matches!(
            start_bulk_delete(&runner, &repo, Vec::new()),
            Err(StartJobError::EmptySelection)
        ));
    }

    #[tokio::test]
    async fn test_scan_job_catalogues_new_files() {
        let (_dir, repo, library) = setup();
        std::fs::write(library.join("vase.stl"), box_stl(60.0, 60.0, 180.0)).unwrap();
        std::fs::write(library.join("nested/bracket.stl"), box_stl(10.0, 5.0, 2.0)).unwrap();

        let runner = BulkRunner::new(Arc::new(JobTracker::new()), 2);
        let (_, handle) = start_library_scan(&runner, &repo, &library, true).unwrap();
        let summary = handle.await.unwrap();
        assert_eq!(summary.completed, 2);

        let files = repo.get_all().unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| !f.tags.is_empty()));
    }

    #[test]
    fn test_thumbnail_prefers_stored_path() {
        let (dir, repo, library) = setup();
        let path = library.join("a.stl");
        std::fs::write(&path, b"x").unwrap();
        let mut file = ingest_path(&repo, &path, false).unwrap().unwrap();
        assert!(thumbnail_bytes(&file).is_none());

        let thumb = dir.path().join("a.png");
        std::fs::write(&thumb, b"png").unwrap();
        file.thumbnail_path = Some(thumb.display().to_string());
        assert_eq!(thumbnail_bytes(&file).as_deref(), Some(&b"png"[..]));
    }
}
