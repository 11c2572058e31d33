//! Configuration
//!
//! Settings come from, lowest precedence first: built-in defaults, config
//! files, environment, command-line flags. Files are TOML:
//!
//! ```toml
//! log_list = "https://www.gstatic.com/ct/log_list/v3/log_list.json"
//! output_dir = "~/Downloads"
//! timeout_secs = 300
//! workers = 0          # 0 = one per CPU
//! sidecar_suffix = ".sct"  # "" disables the sidecar lookup
//! ```
//!
//! Without `--config`, `$XDG_CONFIG_HOME/btget/config.toml` and then
//! `~/.btget.toml` are read if present, the later one overriding keys of the
//! earlier one.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{Error, Result};
use crate::helpers::acquire::http::DEFAULT_HTTP_TIMEOUT_SECS;
use crate::transparency::collector::DEFAULT_SIDECAR_SUFFIX;
use crate::transparency::digest::Digest;
use crate::transparency::registry::DEFAULT_LOG_LIST_URL;

const MIN_TIMEOUT_SECS: u64 = 5;
const MAX_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    pub log_list: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub workers: Option<usize>,
    pub sidecar_suffix: Option<String>,
}

impl ConfigToml {
    fn merge(&mut self, other: ConfigToml) {
        if other.log_list.is_some() {
            self.log_list = other.log_list;
        }
        if other.output_dir.is_some() {
            self.output_dir = other.output_dir;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.workers.is_some() {
            self.workers = other.workers;
        }
        if other.sidecar_suffix.is_some() {
            self.sidecar_suffix = other.sidecar_suffix;
        }
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_list: Option<String>,
    pub output: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub expected_sha256: Option<Digest>,
    pub sct_files: Vec<PathBuf>,
    pub no_sidecar: bool,
}

/// Effective settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path or URL of the log list.
    pub log_list: String,
    pub output_dir: PathBuf,
    /// Explicit destination; wins over `output_dir`.
    pub output: Option<PathBuf>,
    pub timeout: Duration,
    pub workers: usize,
    /// `None` disables the sidecar lookup.
    pub sidecar_suffix: Option<String>,
    pub sct_files: Vec<PathBuf>,
    pub expected_sha256: Option<Digest>,
}

impl Default for Config {
    fn default() -> Self {
        Self::resolve(ConfigToml::default(), Overrides::default())
    }
}

impl Config {
    /// Load config files and apply `overrides`.
    ///
    /// An explicit path must exist; discovered files are optional.
    pub fn load(explicit: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let file = match explicit {
            Some(path) => read_toml(path)?,
            None => load_files(&find_config_files())?,
        };
        Ok(Self::resolve(file, overrides))
    }

    pub fn resolve(file: ConfigToml, overrides: Overrides) -> Self {
        let timeout_secs = overrides
            .timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
            .clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS);

        let workers = match file.workers.unwrap_or(0) {
            0 => num_cpus::get(),
            n => n,
        };

        let sidecar_suffix = if overrides.no_sidecar {
            None
        } else {
            Some(
                file.sidecar_suffix
                    .unwrap_or_else(|| DEFAULT_SIDECAR_SUFFIX.to_string()),
            )
            .filter(|s| !s.is_empty())
        };

        Self {
            log_list: overrides
                .log_list
                .or(file.log_list)
                .unwrap_or_else(|| DEFAULT_LOG_LIST_URL.to_string()),
            output_dir: file
                .output_dir
                .map(|dir| expand_home(&dir))
                .unwrap_or_else(|| PathBuf::from(".")),
            output: overrides.output,
            timeout: Duration::from_secs(timeout_secs),
            workers,
            sidecar_suffix,
            sct_files: overrides.sct_files,
            expected_sha256: overrides.expected_sha256,
        }
    }
}

fn xdg_config_home() -> PathBuf {
    if let Ok(raw) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".").join(".config"))
}

fn find_config_files() -> Vec<PathBuf> {
    let mut paths = vec![xdg_config_home().join("btget").join("config.toml")];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".btget.toml"));
    }
    paths
}

fn load_files(candidates: &[PathBuf]) -> Result<ConfigToml> {
    let mut merged = ConfigToml::default();
    for path in candidates {
        if !path.exists() {
            continue;
        }
        merged.merge(read_toml(path)?);
    }
    Ok(merged)
}

fn read_toml(path: &Path) -> Result<ConfigToml> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    toml::from_str(&text).map_err(|e| Error::Config(format!("invalid TOML in {}: {e}", path.display())))
}

fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}
