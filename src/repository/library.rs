//! Library file repository for SQLite persistence.

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::{Path, PathBuf};

use super::{parse_datetime, to_option, RepositoryError, Result};
use crate::models::{FileType, LibraryFile, NewLibraryFile};

const SELECT_COLUMNS: &str = "SELECT id, file_name, original_name, file_type, file_size, \
     file_path, thumbnail_path, description, tags, file_hash, created_at, updated_at \
     FROM library_files";

/// SQLite-backed library file repository.
#[derive(Debug, Clone)]
pub struct LibraryRepository {
    db_path: PathBuf,
}

fn row_to_file(row: &Row<'_>) -> rusqlite::Result<LibraryFile> {
    let file_path: String = row.get("file_path")?;
    let file_type = FileType::from_str(&row.get::<_, String>("file_type")?)
        .or_else(|| FileType::from_path(Path::new(&file_path)))
        .unwrap_or(FileType::ThreeMf);

    Ok(LibraryFile {
        id: row.get("id")?,
        file_name: row.get("file_name")?,
        original_name: row.get("original_name")?,
        file_type,
        file_size: row.get::<_, i64>("file_size")?.max(0) as u64,
        file_path,
        thumbnail_path: row.get("thumbnail_path")?,
        description: row.get("description")?,
        tags: row
            .get::<_, Option<String>>("tags")?
            .and_then(|t| serde_json::from_str(&t).ok())
            .unwrap_or_default(),
        file_hash: row.get("file_hash")?,
        created_at: parse_datetime(&row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(&row.get::<_, String>("updated_at")?),
    })
}

impl LibraryRepository {
    /// Create a new library repository, creating the schema if needed.
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    /// Path of the backing database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        super::connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS library_files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_name TEXT NOT NULL,
                original_name TEXT NOT NULL,
                file_type TEXT NOT NULL,
                file_size INTEGER NOT NULL DEFAULT 0,
                file_path TEXT NOT NULL UNIQUE,
                thumbnail_path TEXT,
                description TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                file_hash TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_library_files_hash ON library_files(file_hash);
        "#,
        )?;
        Ok(())
    }

    /// Insert a new library file and return the stored record.
    pub fn insert(&self, file: &NewLibraryFile) -> Result<LibraryFile> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO library_files (file_name, original_name, file_type, file_size, file_path,
                                       thumbnail_path, description, tags, file_hash,
                                       created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            "#,
            params![
                file.file_name,
                file.original_name,
                file.file_type.as_str(),
                file.file_size as i64,
                file.file_path,
                file.thumbnail_path,
                file.description,
                serde_json::to_string(&file.tags)?,
                file.file_hash,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        self.get(id)?.ok_or(RepositoryError::NotFound(id))
    }

    /// Get a library file by ID.
    pub fn get(&self, id: i64) -> Result<Option<LibraryFile>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?"))?;
        to_option(stmt.query_row(params![id], row_to_file))
    }

    /// Get all library files, oldest (lowest id) first.
    pub fn get_all(&self) -> Result<Vec<LibraryFile>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id ASC"))?;
        let files = stmt
            .query_map([], row_to_file)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    /// Get the library files with the given IDs, ordered by id. Unknown IDs are skipped.
    pub fn get_many(&self, ids: &[i64]) -> Result<Vec<LibraryFile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connect()?;
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE id IN ({placeholders}) ORDER BY id ASC"
        ))?;
        let files = stmt
            .query_map(params_from_iter(ids.iter()), row_to_file)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    /// Find a library file by its on-disk path.
    pub fn find_by_path(&self, file_path: &str) -> Result<Option<LibraryFile>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE file_path = ?"))?;
        to_option(stmt.query_row(params![file_path], row_to_file))
    }

    /// Find all library files with the given content hash.
    pub fn find_by_hash(&self, hash: &str) -> Result<Vec<LibraryFile>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE file_hash = ? ORDER BY id ASC"))?;
        let files = stmt
            .query_map(params![hash], row_to_file)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    fn require(&self, id: i64) -> Result<LibraryFile> {
        self.get(id)?.ok_or(RepositoryError::NotFound(id))
    }

    /// Store a generated description and tag list.
    pub fn update_description_and_tags(
        &self,
        id: i64,
        description: &str,
        tags: &[String],
    ) -> Result<LibraryFile> {
        let conn = self.connect()?;
        let rows = conn.execute(
            "UPDATE library_files SET description = ?, tags = ?, updated_at = ? WHERE id = ?",
            params![
                description,
                serde_json::to_string(tags)?,
                Utc::now().to_rfc3339(),
                id
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        self.require(id)
    }

    /// Replace the description of a library file.
    pub fn update_description(&self, id: i64, description: Option<&str>) -> Result<LibraryFile> {
        let conn = self.connect()?;
        let rows = conn.execute(
            "UPDATE library_files SET description = ?, updated_at = ? WHERE id = ?",
            params![description, Utc::now().to_rfc3339(), id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        self.require(id)
    }

    /// Replace the tag list of a library file.
    pub fn update_tags(&self, id: i64, tags: &[String]) -> Result<LibraryFile> {
        let conn = self.connect()?;
        let rows = conn.execute(
            "UPDATE library_files SET tags = ?, updated_at = ? WHERE id = ?",
            params![serde_json::to_string(tags)?, Utc::now().to_rfc3339(), id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        self.require(id)
    }

    /// Delete a library file record. Returns whether a row was removed.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.connect()?;
        let rows = conn.execute("DELETE FROM library_files WHERE id = ?", params![id])?;
        Ok(rows > 0)
    }

    /// Count catalogued files.
    pub fn count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM library_files", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}
