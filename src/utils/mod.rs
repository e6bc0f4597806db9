//! Shared utility functions.

mod format;

pub use format::{format_duration, format_size};
