//! Duplicate detection over the library catalogue.
//!
//! Hash grouping is exact. Name and size grouping are heuristics and their
//! groups say so in `reason`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::models::LibraryFile;
use crate::utils::format_size;

/// Key used to partition files into duplicate groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Hash,
    Name,
    Size,
}

impl GroupBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Name => "name",
            Self::Size => "size",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hash" => Some(Self::Hash),
            "name" => Some(Self::Name),
            "size" => Some(Self::Size),
            _ => None,
        }
    }

    /// Whether group members are guaranteed to have identical content.
    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Hash)
    }

    fn reason(&self) -> &'static str {
        match self {
            Self::Hash => "same content hash",
            Self::Name => "same file name (content may differ)",
            Self::Size => "same file size (content may differ)",
        }
    }
}

/// A set of two or more files sharing a grouping key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub name: String,
    /// Members ordered by id ascending, oldest first.
    pub files: Vec<LibraryFile>,
    pub total_size: u64,
    pub reason: String,
}

/// Lowercased display name without its final extension.
fn normalized_name(file: &LibraryFile) -> String {
    let name = file.display_name();
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
        .to_lowercase()
}

fn group_key(file: &LibraryFile, group_by: GroupBy) -> Option<String> {
    match group_by {
        GroupBy::Hash => file.file_hash.clone().filter(|h| !h.is_empty()),
        GroupBy::Name => Some(normalized_name(file)),
        GroupBy::Size => Some(file.file_size.to_string()),
    }
}

/// Partition `files` by `group_by`, keeping partitions with at least two
/// members. Groups are returned largest total size first.
pub fn group_duplicates(files: &[LibraryFile], group_by: GroupBy) -> Vec<DuplicateGroup> {
    let mut partitions: HashMap<String, Vec<LibraryFile>> = HashMap::new();
    for file in files {
        if let Some(key) = group_key(file, group_by) {
            partitions.entry(key).or_default().push(file.clone());
        }
    }

    let mut groups: Vec<DuplicateGroup> = partitions
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(key, mut members)| {
            members.sort_by_key(|f| f.id);
            let total_size = members.iter().map(|f| f.file_size).sum();
            let name = match group_by {
                GroupBy::Hash => members[0].display_name().to_string(),
                GroupBy::Name => key,
                GroupBy::Size => format_size(members[0].file_size),
            };
            DuplicateGroup {
                name,
                files: members,
                total_size,
                reason: group_by.reason().to_string(),
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        b.total_size
            .cmp(&a.total_size)
            .then_with(|| a.files[0].id.cmp(&b.files[0].id))
    });
    groups
}
