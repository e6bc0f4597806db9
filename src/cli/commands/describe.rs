//! Describe a single model file without touching the library.

use std::path::Path;

use console::style;

use crate::analysis::describe_model;

/// Print the generated description and tags for `file`.
pub async fn cmd_describe(file: &Path, name: Option<&str>, json: bool) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }

    let file_name = match name {
        Some(name) => name.to_string(),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let path = file.to_path_buf();
    let describe_name = file_name.clone();
    let result =
        tokio::task::spawn_blocking(move || describe_model(&path, &describe_name)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", style(&file_name).bold());
    println!("  {:<12} {}", "Description:", result.description);
    println!("  {:<12} {}", "Tags:", result.tags.join(", "));
    println!("  {:<12} {}", "Language:", result.language);
    if let Some(meta) = &result.metadata {
        if let Some(designer) = &meta.designer {
            println!("  {:<12} {}", "Designer:", designer);
        }
        if let Some(application) = &meta.application {
            println!("  {:<12} {}", "Application:", application);
        }
        if let Some(license) = &meta.license {
            println!("  {:<12} {}", "License:", license);
        }
    }
    Ok(())
}
