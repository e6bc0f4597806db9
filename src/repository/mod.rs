//! Repository layer for database persistence.
//!
//! Synchronous rusqlite access. Each operation opens its own connection,
//! so repositories are cheap to clone and share across worker tasks.

mod library;

pub use library::LibraryRepository;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Errors returned by repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Library file not found: {0}")]
    NotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Open a database connection with concurrency settings suited to many
/// short-lived connections from parallel workers.
pub(crate) fn connect(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(db_path)?;
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 30000;
    "#,
    )?;
    Ok(conn)
}

/// Map `QueryReturnedNoRows` to `None`.
pub(crate) fn to_option<T>(result: rusqlite::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime() {
        let dt = parse_datetime("2024-03-01T12:30:00+02:00");
        assert_eq!(dt.to_rfc3339(), "2024-03-01T10:30:00+00:00");
        assert_eq!(parse_datetime("yesterday"), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_to_option() {
        let missing: rusqlite::Result<i64> = Err(rusqlite::Error::QueryReturnedNoRows);
        assert!(to_option(missing).unwrap().is_none());
        assert_eq!(to_option(Ok(3)).unwrap(), Some(3));
    }
}
