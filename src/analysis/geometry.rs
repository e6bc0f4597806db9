//! Binary STL sampling and size/shape classification.

use serde::Serialize;
use std::path::Path;

/// Maximum triangles read per file, regardless of the declared count.
pub const MAX_SAMPLED_TRIANGLES: u32 = 10_000;

const HEADER_LEN: usize = 80;
const TRIANGLE_RECORD_LEN: usize = 50;
const NORMAL_LEN: usize = 12;

/// Size and shape summary derived from mesh bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryProfile {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
    /// Triangle count declared in the STL header.
    pub triangle_count: u32,
    pub tags: Vec<&'static str>,
    pub features: Vec<&'static str>,
    /// Rounded `W×D×Hmm` string.
    pub dimensions: String,
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: [f32; 3],
    max: [f32; 3],
}

impl Bounds {
    fn empty() -> Self {
        Self {
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
        }
    }

    fn include(&mut self, vertex: [f32; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(vertex[axis]);
            self.max[axis] = self.max[axis].max(vertex[axis]);
        }
    }

    fn extent(&self, axis: usize) -> f64 {
        let span = f64::from(self.max[axis]) - f64::from(self.min[axis]);
        if span.is_finite() && span > 0.0 {
            span
        } else {
            0.0
        }
    }
}

fn read_f32(buf: &[u8], offset: usize) -> Option<f32> {
    let bytes: [u8; 4] = buf.get(offset..offset + 4)?.try_into().ok()?;
    Some(f32::from_le_bytes(bytes))
}

fn read_triangle(buf: &[u8], offset: usize) -> Option<[[f32; 3]; 3]> {
    let mut vertices = [[0.0f32; 3]; 3];
    for (i, vertex) in vertices.iter_mut().enumerate() {
        let base = offset + i * 12;
        *vertex = [
            read_f32(buf, base)?,
            read_f32(buf, base + 4)?,
            read_f32(buf, base + 8)?,
        ];
    }
    Some(vertices)
}

/// Parse the sampled triangle stream of a binary STL held in memory.
///
/// Returns `None` for ASCII STL (header mentions "solid") and for buffers
/// too short to hold the header and triangle count. Sampling stops at the
/// last complete triangle when the stream is shorter than declared.
pub fn analyze_stl_bytes(buf: &[u8]) -> Option<GeometryProfile> {
    let header = buf.get(..HEADER_LEN)?;
    if String::from_utf8_lossy(header)
        .to_lowercase()
        .contains("solid")
    {
        return None;
    }

    let count_bytes: [u8; 4] = buf.get(HEADER_LEN..HEADER_LEN + 4)?.try_into().ok()?;
    let triangle_count = u32::from_le_bytes(count_bytes);

    let mut bounds = Bounds::empty();
    let mut offset = HEADER_LEN + 4;
    for _ in 0..triangle_count.min(MAX_SAMPLED_TRIANGLES) {
        let Some(vertices) = read_triangle(buf, offset + NORMAL_LEN) else {
            break;
        };
        for vertex in vertices {
            bounds.include(vertex);
        }
        offset += TRIANGLE_RECORD_LEN;
    }

    Some(analyze_model_dimensions(
        bounds.extent(0),
        bounds.extent(1),
        bounds.extent(2),
        triangle_count,
    ))
}

/// Read a binary STL from disk and classify its bounding box.
///
/// Any read failure yields `None`; callers degrade to filename-only analysis.
pub fn analyze_stl_geometry(path: &Path) -> Option<GeometryProfile> {
    match std::fs::read(path) {
        Ok(buf) => {
            let profile = analyze_stl_bytes(&buf);
            if profile.is_none() {
                tracing::debug!("No binary STL geometry in {}", path.display());
            }
            profile
        }
        Err(e) => {
            tracing::warn!("Error analyzing STL geometry {}: {}", path.display(), e);
            None
        }
    }
}

/// Classify model bounds into size, shape and complexity hints.
///
/// The 100-200mm band intentionally gets no size tag.
pub fn analyze_model_dimensions(
    width: f64,
    depth: f64,
    height: f64,
    triangle_count: u32,
) -> GeometryProfile {
    let mut tags = Vec::new();
    let mut features = Vec::new();

    let max_dim = width.max(depth).max(height);

    if max_dim < 30.0 {
        tags.push("miniature");
        features.push("small model (< 30mm)");
    } else if max_dim < 100.0 {
        tags.push("small");
        features.push("small to medium size");
    } else if max_dim > 200.0 {
        tags.push("large");
        features.push("large print (> 200mm)");
    }

    let aspect_ratio = height / width.max(depth);
    if aspect_ratio > 2.5 {
        tags.push("vertical");
        features.push("tall vertical design");
    } else if aspect_ratio < 0.2 {
        tags.push("flat");
        features.push("flat/thin design");
    }

    let tolerance = max_dim * 0.1;
    if (width - depth).abs() < tolerance && (width - height).abs() < tolerance {
        features.push("cubic/symmetrical");
    }

    if triangle_count > 100_000 {
        features.push("high detail model");
    } else if triangle_count > 0 && triangle_count < 1000 {
        features.push("low poly design");
    }

    GeometryProfile {
        width,
        depth,
        height,
        triangle_count,
        tags,
        features,
        dimensions: format!(
            "{}×{}×{}mm",
            width.round() as i64,
            depth.round() as i64,
            height.round() as i64
        ),
    }
}
