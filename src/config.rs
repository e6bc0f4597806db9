//! Configuration management for printdeck using the prefer crate.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "printdeck.db";

/// Default library subdirectory name.
const LIBRARY_SUBDIR: &str = "library";

/// Default HTTP bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:3040";

/// Default number of bulk job workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Directory scanned for model files.
    pub library_dir: PathBuf,
    /// HTTP bind address.
    pub bind: String,
    /// Concurrent workers per bulk job.
    pub workers: usize,
    /// Describe and tag newly scanned files.
    pub auto_describe_on_scan: bool,
}

impl Default for Settings {
    fn default() -> Self {
        // Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("printdeck");

        Self {
            library_dir: data_dir.join(LIBRARY_SUBDIR),
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            bind: DEFAULT_BIND.to_string(),
            workers: DEFAULT_WORKERS,
            auto_describe_on_scan: true,
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            library_dir: data_dir.join(LIBRARY_SUBDIR),
            data_dir,
            ..Default::default()
        }
    }

    /// Get the full path to the database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Ensure data and library directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [&self.data_dir, &self.library_dir] {
            fs::create_dir_all(dir).map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("Failed to create directory {}: {}", dir.display(), e),
                )
            })?;
        }
        Ok(())
    }

    /// Apply `PRINTDECK_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|s| !s.is_empty());

        if let Some(data_dir) = var("PRINTDECK_DATA_DIR") {
            tracing::debug!("Using PRINTDECK_DATA_DIR from environment: {}", data_dir);
            let expanded = shellexpand::tilde(&data_dir).into_owned();
            let relocate_library = self.library_dir == self.data_dir.join(LIBRARY_SUBDIR);
            self.data_dir = PathBuf::from(expanded);
            if relocate_library {
                self.library_dir = self.data_dir.join(LIBRARY_SUBDIR);
            }
        }
        if let Some(library_dir) = var("PRINTDECK_LIBRARY_DIR") {
            tracing::debug!("Using PRINTDECK_LIBRARY_DIR from environment: {}", library_dir);
            self.library_dir = PathBuf::from(shellexpand::tilde(&library_dir).into_owned());
        }
        if let Some(workers) = var("PRINTDECK_WORKERS") {
            match workers.parse::<usize>() {
                Ok(n) => self.workers = n.max(1),
                Err(_) => tracing::warn!("Ignoring invalid PRINTDECK_WORKERS: {}", workers),
            }
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Library directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_dir: Option<String>,
    /// HTTP bind address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    /// Bulk job workers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Describe files during library scans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_describe_on_scan: Option<bool>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers printdeck config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("printdeck").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("{}", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory of the config file, used for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// `~` is expanded; relative paths are joined onto `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
            settings.library_dir = settings.data_dir.join(LIBRARY_SUBDIR);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref library_dir) = self.library_dir {
            settings.library_dir = self.resolve_path(library_dir, base_dir);
        }
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }
        if let Some(workers) = self.workers {
            settings.workers = workers.max(1);
        }
        if let Some(auto_describe) = self.auto_describe_on_scan {
            settings.auto_describe_on_scan = auto_describe;
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Data directory (--data flag), highest precedence.
    pub data: Option<PathBuf>,
}

/// Load settings with explicit options.
/// Precedence: defaults < config file < environment < command line.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let config = match options.config_path {
        Some(ref path) => match Config::load_from_path(path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}", e);
                Config::default()
            }
        },
        None => Config::load().await,
    };

    let mut settings = Settings::default();
    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    config.apply_to_settings(&mut settings, &base_dir);

    settings.apply_env_overrides(|name| std::env::var(name).ok());

    if let Some(data_dir) = options.data {
        if settings.library_dir == settings.data_dir.join(LIBRARY_SUBDIR) {
            settings.library_dir = data_dir.join(LIBRARY_SUBDIR);
        }
        settings.data_dir = data_dir;
    }

    (settings, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_load_toml_yaml_json() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("printdeck.toml");
        fs::write(&toml_path, "data_dir = \"data\"\nworkers = 2\n").unwrap();
        let config = Config::load_from_path(&toml_path).await.unwrap();
        assert_eq!(config.data_dir.as_deref(), Some("data"));
        assert_eq!(config.workers, Some(2));
        assert_eq!(config.base_dir().as_deref(), Some(dir.path()));

        let yaml_path = dir.path().join("printdeck.yaml");
        fs::write(&yaml_path, "bind: 0.0.0.0:8080\nauto_describe_on_scan: false\n").unwrap();
        let config = Config::load_from_path(&yaml_path).await.unwrap();
        assert_eq!(config.bind.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(config.auto_describe_on_scan, Some(false));

        let json_path = dir.path().join("printdeck.json");
        fs::write(&json_path, r#"{"database": "other.db"}"#).unwrap();
        let config = Config::load_from_path(&json_path).await.unwrap();
        assert_eq!(config.database.as_deref(), Some("other.db"));
    }

    #[tokio::test]
    async fn test_invalid_config_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "workers = [").unwrap();
        let err = Config::load_from_path(&path).await.unwrap_err();
        assert!(err.contains("TOML"));
        assert!(Config::load_from_path(&dir.path().join("absent.json"))
            .await
            .is_err());
    }

    #[test]
    fn test_apply_to_settings_resolves_relative_paths() {
        let config = Config {
            data_dir: Some("data".to_string()),
            library_dir: Some("/srv/models".to_string()),
            workers: Some(0),
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/etc/printdeck"));

        assert_eq!(settings.data_dir, PathBuf::from("/etc/printdeck/data"));
        assert_eq!(settings.library_dir, PathBuf::from("/srv/models"));
        assert_eq!(settings.workers, 1);
        assert_eq!(
            settings.database_path(),
            PathBuf::from("/etc/printdeck/data/printdeck.db")
        );
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PRINTDECK_DATA_DIR", "/var/printdeck"),
            ("PRINTDECK_WORKERS", "8"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::with_data_dir(PathBuf::from("/tmp/pd"));
        settings.apply_env_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(settings.data_dir, PathBuf::from("/var/printdeck"));
        assert_eq!(settings.library_dir, PathBuf::from("/var/printdeck/library"));
        assert_eq!(settings.workers, 8);

        let mut settings = Settings::default();
        settings.apply_env_overrides(|name| {
            (name == "PRINTDECK_WORKERS").then(|| "lots".to_string())
        });
        assert_eq!(settings.workers, DEFAULT_WORKERS);
    }
}
