//! Automatic description and tagging of a single library file.
//!
//! Combines the filename heuristics, embedded 3MF metadata and STL geometry.
//! Every extractor degrades to "nothing found", so a result is always
//! produced even for unreadable files.

use regex::Regex;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::LazyLock;

use super::filename::analyze_filename;
use super::geometry::{analyze_stl_geometry, GeometryProfile};
use super::text::{clean_html_text, detect_language, truncate_description, MAX_DESCRIPTION_LENGTH};
use super::threemf::{extract_3mf_metadata, ContainerMetadata};

/// Tag applied when no other tag matched.
pub const DEFAULT_TAG: &str = "3d-model";

/// Description used when even the filename is empty.
const UNTITLED: &str = "Untitled model";

static MODEL_EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(3mf|stl|gcode)$").unwrap());

/// Generated description, tags and any embedded metadata for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeResult {
    pub description: String,
    pub tags: Vec<String>,
    pub language: String,
    pub metadata: Option<ContainerMetadata>,
}

impl DescribeResult {
    /// Result that only knows the filename.
    pub fn fallback(file_name: &str) -> Self {
        Self {
            description: strip_model_extension(file_name),
            tags: vec![DEFAULT_TAG.to_string()],
            language: "en".to_string(),
            metadata: None,
        }
    }
}

/// Filename without a trailing `.3mf`/`.stl`/`.gcode`, never empty.
pub fn strip_model_extension(file_name: &str) -> String {
    let stripped = MODEL_EXTENSION_RE.replace(file_name, "");
    if !stripped.trim().is_empty() {
        stripped.into_owned()
    } else if !file_name.trim().is_empty() {
        file_name.to_string()
    } else {
        UNTITLED.to_string()
    }
}

fn has_extension(file_name: &str, extension: &str) -> bool {
    file_name.to_lowercase().ends_with(extension)
}

fn push_unique(tags: &mut Vec<String>, tag: &str) {
    if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }
}

/// The file readers used by [`describe_model`].
struct Extractors {
    container: fn(&Path) -> Option<ContainerMetadata>,
    geometry: fn(&Path) -> Option<GeometryProfile>,
}

const EXTRACTORS: Extractors = Extractors {
    container: extract_3mf_metadata,
    geometry: analyze_stl_geometry,
};

/// Run one extraction step, treating a panic as "nothing found".
fn isolated<T>(step: &str, file_name: &str, run: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("{} step failed for {}, skipping it", step, file_name);
            None
        }
    }
}

fn describe_with(path: &Path, file_name: &str, extractors: &Extractors) -> DescribeResult {
    let mut description = String::new();
    let mut tags = Vec::new();
    let mut language = "en";
    let mut metadata = None;

    let filename_analysis =
        isolated("filename", file_name, || analyze_filename(file_name)).unwrap_or_default();
    for tag in &filename_analysis.tags {
        push_unique(&mut tags, tag);
    }

    if has_extension(file_name, ".3mf") {
        if let Some(meta) = isolated("3mf", file_name, || (extractors.container)(path)).flatten() {
            if let Some(title) = meta.title.as_deref().filter(|t| !t.is_empty()) {
                if title != file_name {
                    description = clean_html_text(title);
                }
            }
            if let Some(raw) = meta.description.as_deref().filter(|d| !d.is_empty()) {
                description = clean_html_text(raw);
                language = detect_language(&description);
            }
            if meta.designer.as_deref().is_some_and(|d| !d.is_empty()) {
                push_unique(&mut tags, "remix");
            }
            metadata = Some(meta);
        }
    }

    let geometry = if has_extension(file_name, ".stl") {
        isolated("geometry", file_name, || (extractors.geometry)(path)).flatten()
    } else {
        None
    };
    if let Some(profile) = &geometry {
        for tag in &profile.tags {
            push_unique(&mut tags, tag);
        }
    }

    if description.is_empty() {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(feature) = filename_analysis.features.first() {
            parts.push(feature);
        }
        if let Some(profile) = &geometry {
            parts.push(&profile.dimensions);
            if let Some(feature) = profile.features.first() {
                parts.push(feature);
            }
        }
        description = if parts.is_empty() {
            strip_model_extension(file_name)
        } else {
            parts.join(" - ")
        };
    }

    if tags.is_empty() {
        tags.push(DEFAULT_TAG.to_string());
    }

    DescribeResult {
        description: truncate_description(&description, MAX_DESCRIPTION_LENGTH),
        tags,
        language: language.to_string(),
        metadata,
    }
}

/// Describe a model file. Never fails: a panicking extractor is skipped
/// and the remaining steps still contribute. Anything else that panics
/// yields the filename-only fallback.
pub fn describe_model(path: &Path, file_name: &str) -> DescribeResult {
    tracing::debug!("Auto-analyzing: {}", file_name);
    match panic::catch_unwind(AssertUnwindSafe(|| describe_with(path, file_name, &EXTRACTORS))) {
        Ok(result) => {
            tracing::debug!(
                "Generated description for {}: {} [{}]",
                file_name,
                result.description,
                result.tags.join(", ")
            );
            result
        }
        Err(_) => {
            tracing::warn!("Describing {} failed, using filename fallback", file_name);
            DescribeResult::fallback(file_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::geometry::tests::box_stl;
    use crate::analysis::threemf::tests::{model_xml, write_archive};

    #[test]
    fn test_stl_description_from_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phone_holder_v2.stl");
        std::fs::write(&path, box_stl(40.0, 20.0, 10.0)).unwrap();

        let result = describe_model(&path, "phone_holder_v2.stl");
        assert!(result.tags.contains(&"functional".to_string()));
        assert!(result.tags.contains(&"household".to_string()));
        assert!(result.tags.contains(&"small".to_string()));
        assert_eq!(result.description, "40×20×10mm - small to medium size");
        assert!(result.metadata.is_none());
    }

    #[test]
    fn test_unreadable_stl_falls_back_to_filename() {
        let dir = tempfile::tempdir().unwrap();
        let result = describe_model(&dir.path().join("missing.stl"), "phone_holder_v2.stl");
        assert_eq!(result.description, "phone_holder_v2");
        assert!(result.tags.contains(&"functional".to_string()));
    }

    #[test]
    fn test_year_feature_leads_description() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.stl");
        std::fs::write(&path, box_stl(250.0, 100.0, 50.0)).unwrap();

        let result = describe_model(&path, "xmas_2023.stl");
        assert_eq!(result.description, "2023 themed - 250×100×50mm - large print (> 200mm)");
    }

    #[test]
    fn test_3mf_description_wins_over_title() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vase.3mf");
        let xml = model_xml(&[
            ("Title", "Spiral Vase"),
            ("Description", "Great &amp;lt;b&amp;gt;vase&amp;lt;/b&amp;gt;"),
            ("Designer", "someone"),
        ]);
        write_archive(&path, &[("3D/3dmodel.model", xml.as_bytes())]);

        let result = describe_model(&path, "vase.3mf");
        assert_eq!(result.description, "Great vase");
        assert_eq!(result.language, "en");
        assert!(result.tags.contains(&"remix".to_string()));
        assert!(result.tags.contains(&"decorative".to_string()));
        let meta = result.metadata.unwrap();
        assert_eq!(meta.title.as_deref(), Some("Spiral Vase"));
    }

    #[test]
    fn test_3mf_title_and_language() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.3mf");
        let xml = model_xml(&[("Title", "Widget"), ("Description", "这是一个花瓶")]);
        write_archive(&path, &[("3dmodel.model", xml.as_bytes())]);
        let result = describe_model(&path, "m.3mf");
        assert_eq!(result.description, "这是一个花瓶");
        assert_eq!(result.language, "zh");

        let title_only = dir.path().join("t.3mf");
        let xml = model_xml(&[("Title", "Widget")]);
        write_archive(&title_only, &[("3dmodel.model", xml.as_bytes())]);
        assert_eq!(describe_model(&title_only, "t.3mf").description, "Widget");
    }

    #[test]
    fn test_title_equal_to_filename_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gizmo.3mf");
        let xml = model_xml(&[("Title", "gizmo.3mf")]);
        write_archive(&path, &[("3dmodel.model", xml.as_bytes())]);
        assert_eq!(describe_model(&path, "gizmo.3mf").description, "gizmo");
    }

    #[test]
    fn test_no_data_yields_default_tag() {
        let dir = tempfile::tempdir().unwrap();
        let result = describe_model(&dir.path().join("nothing.gcode"), "xyz.GCODE");
        assert_eq!(result.tags, vec![DEFAULT_TAG.to_string()]);
        assert_eq!(result.description, "xyz");

        let empty = describe_model(&dir.path().join("nothing"), "");
        assert_eq!(empty.tags, vec![DEFAULT_TAG.to_string()]);
        assert!(!empty.description.is_empty());
    }

    #[test]
    fn test_description_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.3mf");
        let long = "word ".repeat(200);
        let xml = model_xml(&[("Description", long.as_str())]);
        write_archive(&path, &[("3dmodel.model", xml.as_bytes())]);
        let result = describe_model(&path, "long.3mf");
        assert!(result.description.chars().count() <= MAX_DESCRIPTION_LENGTH);
    }

    #[test]
    fn test_panicking_extractor_keeps_other_steps() {
        let failing = Extractors {
            container: |_| panic!("corrupt archive"),
            geometry: |_| panic!("corrupt mesh"),
        };

        let result = describe_with(Path::new("/nonexistent"), "phone_holder_v2.stl", &failing);
        assert!(result.tags.contains(&"functional".to_string()));
        assert!(result.tags.contains(&"household".to_string()));
        assert_eq!(result.description, "phone_holder_v2");

        let result = describe_with(Path::new("/nonexistent"), "xmas_2023.3mf", &failing);
        assert_eq!(result.description, "2023 themed");
        assert!(result.metadata.is_none());
    }

    #[test]
    fn test_strip_model_extension() {
        assert_eq!(strip_model_extension("a.b.STL"), "a.b");
        assert_eq!(strip_model_extension("notes.txt"), "notes.txt");
        assert_eq!(strip_model_extension(".stl"), ".stl");
        assert_eq!(strip_model_extension(""), UNTITLED);
    }
}
