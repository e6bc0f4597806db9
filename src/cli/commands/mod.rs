//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod auto_tag;
mod describe;
mod duplicates;
mod scan;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "printdeck")]
#[command(about = "3D model library with auto-tagging, duplicate detection and bulk jobs")]
#[command(version)]
pub struct Cli {
    /// Data directory holding printdeck.db (overrides config file)
    #[arg(long, short = 'd', global = true)]
    data: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web API server
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default from config: 127.0.0.1:3040)
        bind: Option<String>,
    },

    /// Catalogue new model files in the library directory
    Scan {
        /// Directory to scan (default: configured library directory)
        dir: Option<PathBuf>,
        /// Skip auto-description of new files
        #[arg(long)]
        no_describe: bool,
        /// List new files without cataloguing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate descriptions and tags for library files
    AutoTag {
        /// File IDs to tag (default: all files)
        ids: Vec<i64>,
        /// Only tag files that have no tags yet
        #[arg(short, long)]
        untagged: bool,
    },

    /// Describe a model file without adding it to the library
    Describe {
        /// Model file (.3mf, .stl or .gcode)
        file: PathBuf,
        /// Name to classify instead of the file's own name
        #[arg(short, long)]
        name: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List duplicate files in the library
    Duplicates {
        /// Grouping: hash (exact), name or size
        #[arg(short, long, default_value = "hash")]
        group_by: String,
        /// Print groups as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        data: cli.data,
    };
    let (settings, config) = load_settings_with_options(options).await;
    if let Some(path) = &config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    match cli.command {
        Commands::Serve { bind } => serve::cmd_serve(&settings, bind.as_deref()).await,
        Commands::Scan {
            dir,
            no_describe,
            dry_run,
        } => scan::cmd_scan(&settings, dir, no_describe, dry_run).await,
        Commands::AutoTag { ids, untagged } => {
            auto_tag::cmd_auto_tag(&settings, ids, untagged).await
        }
        Commands::Describe { file, name, json } => {
            describe::cmd_describe(&file, name.as_deref(), json).await
        }
        Commands::Duplicates { group_by, json } => {
            duplicates::cmd_duplicates(&settings, &group_by, json).await
        }
    }
}
