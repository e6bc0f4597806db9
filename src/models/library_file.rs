//! Library file models.
//!
//! A library file is a catalogued printable model (3MF, STL or gcode).
//! Content is identified by a SHA-256 hash, which drives exact duplicate
//! detection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Kind of model file stored in the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[serde(rename = "3mf")]
    ThreeMf,
    Stl,
    Gcode,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThreeMf => "3mf",
            Self::Stl => "stl",
            Self::Gcode => "gcode",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "3mf" => Some(Self::ThreeMf),
            "stl" => Some(Self::Stl),
            "gcode" => Some(Self::Gcode),
            _ => None,
        }
    }

    /// Detect the file type from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }
}

/// A catalogued model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryFile {
    /// Database row ID. Ascending ids mean older entries.
    pub id: i64,
    /// Name of the file on disk.
    pub file_name: String,
    /// Name the file was ingested under.
    pub original_name: String,
    pub file_type: FileType,
    /// Size in bytes.
    pub file_size: u64,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// SHA-256 hex digest of the file content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LibraryFile {
    /// Name shown to users: the original name, or the on-disk name if it is blank.
    pub fn display_name(&self) -> &str {
        if self.original_name.trim().is_empty() {
            &self.file_name
        } else {
            &self.original_name
        }
    }
}

/// A library file that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewLibraryFile {
    pub file_name: String,
    pub original_name: String,
    pub file_type: FileType,
    pub file_size: u64,
    pub file_path: String,
    pub thumbnail_path: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub file_hash: Option<String>,
}

impl NewLibraryFile {
    /// Compute SHA-256 hash of content.
    pub fn compute_hash(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    /// Build a record for a file on disk, hashing its content.
    ///
    /// Returns `None` when the extension is not a supported model type.
    pub fn from_path(path: &Path) -> std::io::Result<Option<Self>> {
        let Some(file_type) = FileType::from_path(path) else {
            return Ok(None);
        };
        let content = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Some(Self {
            original_name: file_name.clone(),
            file_name,
            file_type,
            file_size: content.len() as u64,
            file_path: path.display().to_string(),
            thumbnail_path: None,
            description: None,
            tags: Vec::new(),
            file_hash: Some(Self::compute_hash(&content)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_file_type_from_path() {
        assert_eq!(
            FileType::from_path(&PathBuf::from("a/b/Vase.3MF")),
            Some(FileType::ThreeMf)
        );
        assert_eq!(
            FileType::from_path(&PathBuf::from("bracket.stl")),
            Some(FileType::Stl)
        );
        assert_eq!(
            FileType::from_path(&PathBuf::from("plate.gcode")),
            Some(FileType::Gcode)
        );
        assert_eq!(FileType::from_path(&PathBuf::from("notes.txt")), None);
        assert_eq!(FileType::from_path(&PathBuf::from("noext")), None);
    }

    #[test]
    fn test_compute_hash_is_deterministic() {
        let a = NewLibraryFile::compute_hash(b"solid cube");
        let b = NewLibraryFile::compute_hash(b"solid cube");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, NewLibraryFile::compute_hash(b"solid cone"));
    }

    #[test]
    fn test_file_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&FileType::ThreeMf).unwrap(),
            "\"3mf\""
        );
        assert_eq!(serde_json::to_string(&FileType::Stl).unwrap(), "\"stl\"");
    }

    #[test]
    fn test_from_path_hashes_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Hook.STL");
        std::fs::write(&path, b"0123456789").unwrap();

        let record = NewLibraryFile::from_path(&path).unwrap().unwrap();
        assert_eq!(record.file_type, FileType::Stl);
        assert_eq!(record.file_size, 10);
        assert_eq!(record.file_name, "Hook.STL");
        assert_eq!(
            record.file_hash.as_deref(),
            Some(NewLibraryFile::compute_hash(b"0123456789").as_str())
        );

        let other = dir.path().join("readme.md");
        std::fs::write(&other, b"x").unwrap();
        assert!(NewLibraryFile::from_path(&other).unwrap().is_none());
    }
}
