//! Run configuration
//!
//! A [`Config`] is built once at startup and handed to the engine by reference.
//! It is layered from TOML files and then from command-line/environment
//! overrides:
//!
//! ```toml
//! repositories = ["https://deps.example.com/artifacts", "/mnt/share/deps"]
//! dependency_directory = "dep"
//! seven_zip_executable = "/usr/bin/7z"
//! http_timeout_secs = 30
//! ```
//!
//! Files are read from `~/.deprc/config.toml` and then `./config.toml`; keys in
//! later files replace keys from earlier ones.

use crate::core::error::SetupError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default dependency output directory (relative to the working directory)
pub const DEFAULT_DEPENDENCY_DIRECTORY: &str = "dep";

/// Default per-request HTTP timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

const MIN_HTTP_TIMEOUT_SECS: u64 = 1;
const MAX_HTTP_TIMEOUT_SECS: u64 = 600;

/// Default location of the 7-Zip command line tool.
#[cfg(windows)]
pub const DEFAULT_SEVEN_ZIP: &str = "C:/Program Files/7-Zip/7z.exe";
#[cfg(not(windows))]
pub const DEFAULT_SEVEN_ZIP: &str = "7z";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    pub repositories: Option<Vec<String>>,
    pub dependency_directory: Option<PathBuf>,
    pub seven_zip_executable: Option<PathBuf>,
    pub http_timeout_secs: Option<u64>,
    pub staging_dir: Option<PathBuf>,
}

impl ConfigToml {
    /// Overlay `other` on top of `self`, key by key.
    pub fn merge(&mut self, other: ConfigToml) {
        if other.repositories.is_some() {
            self.repositories = other.repositories;
        }
        if other.dependency_directory.is_some() {
            self.dependency_directory = other.dependency_directory;
        }
        if other.seven_zip_executable.is_some() {
            self.seven_zip_executable = other.seven_zip_executable;
        }
        if other.http_timeout_secs.is_some() {
            self.http_timeout_secs = other.http_timeout_secs;
        }
        if other.staging_dir.is_some() {
            self.staging_dir = other.staging_dir;
        }
    }
}

/// Command-line / environment overrides, applied after the config files.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Sources tried before the configured repositories
    pub registries: Vec<String>,
    pub dependency_directory: Option<PathBuf>,
    pub seven_zip_executable: Option<PathBuf>,
    pub http_timeout_secs: Option<u64>,
}

/// Immutable configuration for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Sources in priority order (URLs or directories)
    pub repositories: Vec<String>,
    pub dependency_directory: PathBuf,
    pub seven_zip_executable: PathBuf,
    /// Finite timeout applied to each remote attempt
    pub http_timeout: Duration,
    /// Where staging files are created (system temp dir when `None`)
    pub staging_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            dependency_directory: PathBuf::from(DEFAULT_DEPENDENCY_DIRECTORY),
            seven_zip_executable: PathBuf::from(DEFAULT_SEVEN_ZIP),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            staging_dir: None,
        }
    }
}

impl Config {
    /// Build a config from merged file values plus overrides.
    pub fn resolve(file: ConfigToml, overrides: Overrides) -> Self {
        let mut repositories = overrides.registries;
        repositories.extend(file.repositories.unwrap_or_default());

        let timeout_secs = overrides
            .http_timeout_secs
            .or(file.http_timeout_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
            .clamp(MIN_HTTP_TIMEOUT_SECS, MAX_HTTP_TIMEOUT_SECS);

        Self {
            repositories,
            dependency_directory: overrides
                .dependency_directory
                .or(file.dependency_directory)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DEPENDENCY_DIRECTORY)),
            seven_zip_executable: overrides
                .seven_zip_executable
                .or(file.seven_zip_executable)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SEVEN_ZIP)),
            http_timeout: Duration::from_secs(timeout_secs),
            staging_dir: file.staging_dir,
        }
    }

    /// Load config files and apply overrides.
    ///
    /// With `explicit` set, only that file is read and it must exist.
    /// Otherwise the default search path is used and missing files are skipped.
    pub fn load(explicit: Option<&Path>, overrides: Overrides) -> Result<Self, SetupError> {
        let file = match explicit {
            Some(path) => read_toml(path)?,
            None => load_search_path(&default_config_files())?,
        };
        Ok(Self::resolve(file, overrides))
    }
}

/// Config files consulted when no explicit file is given, lowest priority first.
pub fn default_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".deprc").join("config.toml"));
    }
    paths.push(PathBuf::from("config.toml"));
    paths
}

fn read_toml(path: &Path) -> Result<ConfigToml, SetupError> {
    let text = std::fs::read_to_string(path).map_err(|source| SetupError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<ConfigToml>(&text).map_err(|source| SetupError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

fn load_search_path(candidates: &[PathBuf]) -> Result<ConfigToml, SetupError> {
    let mut merged = ConfigToml::default();
    for path in candidates {
        if !path.is_file() {
            continue;
        }
        merged.merge(read_toml(path)?);
    }
    Ok(merged)
}
