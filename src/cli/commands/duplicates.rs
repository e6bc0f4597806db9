//! Duplicate report command.

use console::style;

use crate::config::Settings;
use crate::duplicates::{group_duplicates, GroupBy};
use crate::utils::format_size;

use super::super::helpers::{open_repository, truncate};

/// List duplicate groups in the library.
pub async fn cmd_duplicates(settings: &Settings, group_by: &str, json: bool) -> anyhow::Result<()> {
    let Some(group_by) = GroupBy::from_str(group_by) else {
        anyhow::bail!("Unknown grouping '{}' (expected hash, name or size)", group_by);
    };

    let repo = open_repository(settings)?;
    let files = repo.get_all()?;
    let groups = group_duplicates(&files, group_by);

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    if groups.is_empty() {
        println!(
            "{} No duplicates found by {}",
            style("✓").green(),
            group_by.as_str()
        );
        return Ok(());
    }

    println!(
        "\n{}",
        style(format!("Duplicate groups by {}", group_by.as_str())).bold()
    );
    for group in &groups {
        println!(
            "\n{} {} ({} files, {}) - {}",
            style("●").cyan(),
            truncate(&group.name, 60),
            group.files.len(),
            format_size(group.total_size),
            style(&group.reason).dim()
        );
        for (index, file) in group.files.iter().enumerate() {
            let marker = if index == 0 && group_by.is_exact() {
                style("keep").green().to_string()
            } else {
                style("    ").dim().to_string()
            };
            println!(
                "  {} #{:<6} {:>10}  {}",
                marker,
                file.id,
                format_size(file.file_size),
                file.file_path
            );
        }
    }

    Ok(())
}
