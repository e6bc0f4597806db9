//! printdeck - model library for a 3D print farm.
//!
//! Catalogues 3MF, STL and gcode files, generates descriptions and tags from
//! filenames, embedded 3MF metadata and STL geometry, finds duplicates, and
//! runs bulk jobs (scan, auto-tag, delete) with progress tracking and
//! cancellation.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod jobs;
pub mod models;
pub mod repository;
pub mod server;
pub mod services;
pub mod utils;
