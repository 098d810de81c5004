//! Configuration file structure for `.gazekit.toml`
//!
//! Configuration files can be placed in:
//! - User home directory: `~/.gazekit.toml` (user defaults)
//! - Project directory: `./.gazekit.toml` (project defaults)
//!
//! Precedence order (highest to lowest):
//! 1. Command-line arguments
//! 2. Project config
//! 3. User config
//! 4. Built-in defaults

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".gazekit.toml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Defaults for `download` and `scan`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetConfig>,

    /// Defaults for `map-aois`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aoi: Option<AoiConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory that holds one subdirectory per dataset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_finished: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<bool>,
}

impl DatasetConfig {
    fn overlay(self, over: Self) -> Self {
        Self {
            root: over.root.or(self.root),
            extract: over.extract.or(self.extract),
            remove_finished: over.remove_finished.or(self.remove_finished),
            resume: over.resume.or(self.resume),
        }
    }
}

/// AOI table column names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AoiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_x: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_y: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_x: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_y: Option<String>,

    /// Page column of the AOI table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,

    /// Page column of the event table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_page: Option<String>,
}

impl AoiConfig {
    fn overlay(self, over: Self) -> Self {
        Self {
            start_x: over.start_x.or(self.start_x),
            start_y: over.start_y.or(self.start_y),
            width: over.width.or(self.width),
            height: over.height.or(self.height),
            end_x: over.end_x.or(self.end_x),
            end_y: over.end_y.or(self.end_y),
            page: over.page.or(self.page),
            event_page: over.event_page.or(self.event_page),
        }
    }
}

fn overlay_section<T>(base: Option<T>, over: Option<T>, merge: fn(T, T) -> T) -> Option<T> {
    match (base, over) {
        (Some(base), Some(over)) => Some(merge(base, over)),
        (base, over) => over.or(base),
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Find and load configuration files.
    /// Returns (`user_config`, `project_config`)
    pub fn discover_configs() -> (Option<Self>, Option<Self>) {
        let user_config = Self::user_config_path().and_then(|path| Self::load_optional(&path));
        let project_config = Self::load_optional(&Self::project_config_path());
        (user_config, project_config)
    }

    /// Load a config file if it exists, warning instead of failing on errors.
    fn load_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!(
                    "{} Failed to load config from {}: {e:#}",
                    "Warning:".yellow().bold(),
                    path.display()
                );
                None
            }
        }
    }

    /// Merge with field-level precedence: project values override user values.
    pub fn merge(user_config: Option<Self>, project_config: Option<Self>) -> Self {
        let user = user_config.unwrap_or_default();
        let project = project_config.unwrap_or_default();
        Self {
            dataset: overlay_section(user.dataset, project.dataset, DatasetConfig::overlay),
            aoi: overlay_section(user.aoi, project.aoi, AoiConfig::overlay),
        }
    }

    pub fn discover() -> Self {
        let (user_config, project_config) = Self::discover_configs();
        Self::merge(user_config, project_config)
    }
}
