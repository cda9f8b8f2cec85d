use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot access {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("invalid settings: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Reconciliation service
    #[serde(rename = "service.baseUrl")]
    pub service_base_url: String,

    #[serde(rename = "service.timeoutSecs")]
    pub service_timeout_secs: u64,

    // Export
    #[serde(rename = "export.directory")]
    pub export_directory: Option<PathBuf>,  // None = current directory
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_base_url: DEFAULT_BASE_URL.to_string(),
            service_timeout_secs: DEFAULT_TIMEOUT_SECS,
            export_directory: None,
        }
    }
}

const DEFAULT_FILE: &str = r#"{
    // Reconciliation service
    "service.baseUrl": "http://localhost:5000",
    "service.timeoutSecs": 60,

    // Where exported CSV and zip files are written (null = current directory)
    "export.directory": null
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reconview");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            Self::create_default_file(&path);
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            log::warn!("{e}; using default settings");
            Self::default()
        })
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&contents)
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, SettingsError> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |e: std::io::Error| SettingsError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))?;
        fs::write(path, json).map_err(io_err)
    }

    /// Create default settings file with comments
    fn create_default_file(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("cannot create config directory {}: {e}", parent.display());
                return;
            }
        }
        if let Err(e) = fs::write(path, DEFAULT_FILE) {
            log::warn!("cannot write default settings.json: {e}");
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service_timeout_secs)
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}
