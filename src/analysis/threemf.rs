//! 3MF container inspection.
//!
//! A 3MF file is a zip archive holding an XML model description plus
//! optional slicer metadata and plate thumbnails. Metadata is pulled out
//! with targeted patterns rather than a full XML parse, so slightly broken
//! files written by hobby tools still yield whatever fields are readable.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use zip::ZipArchive;

/// Candidate locations of the model part, in lookup order.
const MODEL_ENTRIES: &[&str] = &["3D/3dmodel.model", "3dmodel.model"];

/// Slicer config entries, matched by substring against entry names.
const CONFIG_ENTRIES: &[&str] = &["Metadata/model_settings.config", "Metadata/slice_info.config"];

/// Errors that can occur while reading a 3MF container.
#[derive(Debug, Error)]
pub enum ThreeMfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("No model part in archive")]
    MissingModel,
}

/// Descriptive fields embedded in the model XML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

fn metadata_pattern(name: &str) -> Regex {
    let pattern = format!(r#"(?i)<metadata\s+name=["']{name}["']>(.*?)</metadata>"#);
    Regex::new(&pattern).unwrap()
}

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| metadata_pattern("Title"));
static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| metadata_pattern("Description"));
static DESIGNER_RE: LazyLock<Regex> =
    LazyLock::new(|| metadata_pattern("(?:Designer|Author|Creator)"));
static APPLICATION_RE: LazyLock<Regex> = LazyLock::new(|| metadata_pattern("Application"));
static LICENSE_RE: LazyLock<Regex> = LazyLock::new(|| metadata_pattern("License"));

fn capture(re: &Regex, xml: &str) -> Option<String> {
    re.captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract metadata fields from model XML text.
///
/// The first matching element in document order wins for each field;
/// designer accepts `Designer`, `Author` or `Creator`.
pub fn parse_model_metadata(xml: &str) -> ContainerMetadata {
    ContainerMetadata {
        title: capture(&TITLE_RE, xml),
        description: capture(&DESCRIPTION_RE, xml),
        designer: capture(&DESIGNER_RE, xml),
        application: capture(&APPLICATION_RE, xml),
        license: capture(&LICENSE_RE, xml),
    }
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>, ThreeMfError> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(file)?)
}

fn read_entry_text(archive: &mut ZipArchive<File>, name: &str) -> Result<String, ThreeMfError> {
    let mut entry = archive.by_name(name)?;
    let mut buffer = Vec::new();
    entry.read_to_end(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn read_model_xml(path: &Path) -> Result<String, ThreeMfError> {
    let mut archive = open_archive(path)?;
    for name in MODEL_ENTRIES {
        match read_entry_text(&mut archive, name) {
            Ok(xml) => return Ok(xml),
            Err(ThreeMfError::Zip(zip::result::ZipError::FileNotFound)) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(ThreeMfError::MissingModel)
}

/// Read title/description/designer/application/license from a 3MF file.
///
/// Returns `None` if the archive cannot be opened or has no model part.
pub fn extract_3mf_metadata(path: &Path) -> Option<ContainerMetadata> {
    match read_model_xml(path) {
        Ok(xml) => Some(parse_model_metadata(&xml)),
        Err(e) => {
            tracing::warn!("Error extracting 3MF metadata from {}: {}", path.display(), e);
            None
        }
    }
}

/// Slicer print settings stored alongside the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintSettings {
    pub model_id: String,
    pub layer_height: Option<f64>,
    pub initial_layer_height: Option<f64>,
    pub wall_loops: Option<i64>,
    pub top_layers: Option<i64>,
    pub bottom_layers: Option<i64>,
    pub infill_density: Option<i64>,
    pub infill_pattern: Option<String>,
    pub support_type: Option<String>,
    pub print_speed: Option<i64>,
    pub travel_speed: Option<i64>,
    pub nozzle_temp: Option<i64>,
    pub bed_temp: Option<i64>,
    pub filament_type: Option<String>,
    pub filament_brand: Option<String>,
    pub filament_color: Option<String>,
    pub estimated_time: Option<i64>,
    pub estimated_filament: Option<f64>,
    pub slicer_version: Option<String>,
    /// Every `key = value` pair found in the config entry.
    pub config: BTreeMap<String, String>,
}

/// Parse slicer `key = value` config text.
///
/// Blank lines and lines starting with `#` or `;` are skipped. Lines split
/// on the first `=`; a line starting with `=` is ignored. Later keys win.
pub fn parse_config_file(content: &str) -> BTreeMap<String, String> {
    let mut config = BTreeMap::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        if let Some((key, value)) = trimmed.split_once('=') {
            let key = key.trim();
            if !key.is_empty() && !trimmed.starts_with('=') {
                config.insert(key.to_string(), value.trim().to_string());
            }
        }
    }
    config
}

/// Parse a leading integer the way lenient slicer values need (`"15%"` -> 15).
fn parse_leading_int(value: &str) -> Option<i64> {
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

/// Parse a leading decimal number (`"0.2mm"` -> 0.2).
fn parse_leading_float(value: &str) -> Option<f64> {
    let value = value.trim();
    let mut seen_dot = false;
    let end = value
        .char_indices()
        .find(|&(i, c)| {
            let ok = c.is_ascii_digit()
                || (i == 0 && (c == '-' || c == '+'))
                || (c == '.' && !seen_dot && {
                    seen_dot = true;
                    true
                });
            !ok
        })
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

impl PrintSettings {
    fn from_config(model_id: String, config: BTreeMap<String, String>) -> Self {
        let text = |key: &str| config.get(key).filter(|v| !v.is_empty()).cloned();
        let int = |key: &str| config.get(key).and_then(|v| parse_leading_int(v));
        let float = |key: &str| config.get(key).and_then(|v| parse_leading_float(v));

        Self {
            model_id,
            layer_height: float("layer_height"),
            initial_layer_height: float("initial_layer_height"),
            wall_loops: int("wall_loops"),
            top_layers: int("top_shell_layers"),
            bottom_layers: int("bottom_shell_layers"),
            infill_density: int("sparse_infill_density"),
            infill_pattern: text("sparse_infill_pattern"),
            support_type: text("support_type"),
            print_speed: int("outer_wall_speed"),
            travel_speed: int("travel_speed"),
            nozzle_temp: int("nozzle_temperature"),
            bed_temp: int("bed_temperature"),
            filament_type: text("filament_type"),
            filament_brand: text("filament_vendor"),
            filament_color: text("filament_colour"),
            estimated_time: int("estimated_time"),
            estimated_filament: float("total_filament_used"),
            slicer_version: None,
            config,
        }
    }
}

/// Read slicer settings and the authoring application from a 3MF file.
pub fn parse_print_settings(path: &Path) -> Result<PrintSettings, ThreeMfError> {
    let mut archive = open_archive(path)?;
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();

    let config_name = names
        .iter()
        .find(|name| CONFIG_ENTRIES.iter().any(|c| name.contains(c)));
    let config = match config_name {
        Some(name) => parse_config_file(&read_entry_text(&mut archive, name)?),
        None => BTreeMap::new(),
    };

    let model_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut settings = PrintSettings::from_config(model_id, config);

    if let Some(model_name) = names.iter().find(|name| name.ends_with(".model")) {
        let xml = read_entry_text(&mut archive, model_name)?;
        settings.slicer_version = capture(&APPLICATION_RE, &xml);
    }

    Ok(settings)
}

/// Extract the first embedded plate thumbnail (PNG bytes), if any.
pub fn extract_3mf_thumbnail(path: &Path) -> Option<Vec<u8>> {
    let result = (|| -> Result<Option<Vec<u8>>, ThreeMfError> {
        let mut archive = open_archive(path)?;
        let name = archive
            .file_names()
            .find(|n| n.contains("Metadata/plate_") && n.ends_with(".png"))
            .map(str::to_string);
        let Some(name) = name else {
            return Ok(None);
        };
        let mut entry = archive.by_name(&name)?;
        let mut buffer = Vec::new();
        entry.read_to_end(&mut buffer)?;
        Ok(Some(buffer))
    })();

    match result {
        Ok(thumbnail) => thumbnail,
        Err(e) => {
            tracing::warn!("Error extracting thumbnail from {}: {}", path.display(), e);
            None
        }
    }
}

/// Check that a path names a readable 3MF archive with a model part.
pub fn is_3mf_file(path: &Path) -> bool {
    let has_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("3mf"));
    if !has_extension {
        return false;
    }
    open_archive(path)
        .map(|archive| archive.file_names().any(|n| n.ends_with(".model")))
        .unwrap_or(false)
}
