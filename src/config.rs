//! Configuration file handling.
//!
//! The configuration lives in `<config dir>/regen/config.toml` unless
//! `REGEN_CONFIG` or `--config` points somewhere else. A missing file means
//! defaults; relative paths resolve against the current directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::rules::RULES_FILENAME;

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "REGEN_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub run: RunConfig,
}

/// Where the archive lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Service declarations and their history files
    pub declarations: PathBuf,
    /// Snapshot store root
    pub snapshots: PathBuf,
    /// Regenerated versions
    pub versions: PathBuf,
    /// Review artifacts (`skipped/`, `to-check/`)
    pub output: PathBuf,
    /// Rules file; defaults to `cleaning/index.json` next to the declarations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            declarations: PathBuf::from("declarations"),
            snapshots: PathBuf::from("snapshots"),
            versions: PathBuf::from("versions"),
            output: PathBuf::from("output"),
            rules: None,
        }
    }
}

impl PathsConfig {
    pub fn rules_path(&self) -> PathBuf {
        if let Some(rules) = &self.rules {
            return rules.clone();
        }
        self.declarations
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join("cleaning")
            .join(RULES_FILENAME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Web URL of the snapshot repository, used to print snapshot links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_repository_url: Option<String>,
    /// Log throughput every that many snapshots (0 disables it)
    pub progress_log_interval: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            snapshot_repository_url: None,
            progress_log_interval: 10,
        }
    }
}

impl Config {
    /// Default configuration file location, honoring `REGEN_CONFIG`.
    pub fn config_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("regen").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Read the configuration at `path`, or defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }
}
