//! Model file analysis.
//!
//! Extractors for STL geometry and 3MF container metadata, filename keyword
//! heuristics, text cleanup, and the describer that combines them.

pub mod describe;
pub mod filename;
pub mod geometry;
pub mod text;
pub mod threemf;

pub use describe::{describe_model, DescribeResult, DEFAULT_TAG};
pub use filename::{analyze_filename, FilenameAnalysis};
pub use geometry::{analyze_model_dimensions, analyze_stl_bytes, analyze_stl_geometry, GeometryProfile};
pub use text::{clean_html_text, detect_language, extract_description, truncate_description};
pub use threemf::{
    extract_3mf_metadata, extract_3mf_thumbnail, is_3mf_file, parse_print_settings,
    ContainerMetadata, PrintSettings, ThreeMfError,
};
