//! Configuration loading
//!
//! Settings live in `guesttracker.yaml`. Lookup order:
//! 1. Explicit path (`--config` / `GTRACK_CONFIG`)
//! 2. `./guesttracker.yaml`
//! 3. Platform config dir (e.g. `~/.config/guesttracker/guesttracker.yaml`)
//!
//! Any missing key falls back to its default.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::core::error::{GtError, Result};

/// Config file name
pub const CONFIG_FILE: &str = "guesttracker.yaml";

/// Guest Tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Root of the shared equipment drive (P-drive)
    pub drive: PathBuf,

    /// SQLite database file
    pub database: PathBuf,

    /// minesite -> model base -> folder relative to `drive`
    pub unit_paths: BTreeMap<String, BTreeMap<String, String>>,

    /// Top-level unit folders to search (lowercase)
    pub search_folders: Vec<String>,

    /// Destination for copied tr3 vibration exports
    pub tr3_export: PathBuf,

    /// Equipment model kept when importing downtime exports
    pub downtime_model: String,

    /// Default lookback for `--since` when not given
    pub lookback_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        let mut fort_hills = BTreeMap::new();
        fort_hills.insert(
            "980E".to_string(),
            "Fort Hills/02. Equipment Files/1. 980E Trucks".to_string(),
        );
        let mut unit_paths = BTreeMap::new();
        unit_paths.insert("FortHills".to_string(), fort_hills);

        let drive = if cfg!(windows) {
            PathBuf::from("P:\\")
        } else {
            PathBuf::from("/Volumes/Public")
        };

        Self {
            drive,
            database: default_data_dir().join("guesttracker.db"),
            unit_paths,
            search_folders: vec!["downloads".to_string()],
            tr3_export: default_data_dir().join("tr3 export"),
            downtime_model: "Komatsu 980E-OS".to_string(),
            lookback_days: 31,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "SMS Equipment", "guesttracker")
}

fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Platform config file path, if a home directory can be determined
    pub fn global_path() -> Option<PathBuf> {
        project_dirs().map(|d| d.config_dir().join(CONFIG_FILE))
    }

    /// Resolve which config file to read, if any exists
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(p) = explicit {
            return Some(p.to_path_buf());
        }

        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        Self::global_path().filter(|p| p.exists())
    }

    /// Load configuration, falling back to defaults when no file exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::resolve_path(explicit) {
            Some(path) => Self::from_file(&path),
            None => {
                tracing::debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GtError::Config(format!("can't read {}: {}", path.display(), e))
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yml::from_str(&content)
            .map_err(|e| GtError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Write this config as YAML
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yml::to_string(self).map_err(|e| GtError::Config(e.to_string()))?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Fail with [`GtError::DriveNotFound`] if the equipment drive isn't mounted
    pub fn drive_exists(&self) -> Result<()> {
        if self.drive.is_dir() {
            Ok(())
        } else {
            Err(GtError::DriveNotFound {
                path: self.drive.clone(),
            })
        }
    }

    /// Relative folder for a minesite/model base pair
    pub fn unit_path(&self, minesite: &str, model_base: &str) -> Option<&str> {
        self.unit_paths
            .get(minesite)
            .and_then(|m| m.get(model_base))
            .map(String::as_str)
    }

    /// Iterate (absolute path, minesite) for all configured equipment folders
    pub fn equip_paths(&self) -> impl Iterator<Item = (PathBuf, &str)> {
        self.unit_paths.iter().flat_map(move |(minesite, models)| {
            models
                .values()
                .map(move |rel| (self.drive.join(rel), minesite.as_str()))
        })
    }
}
