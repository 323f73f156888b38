//! Startup configuration for the sessions.
//!
//! The downloader reads a YAML file describing the build host and the image
//! sets it produces; the flash session reads a plain list of image
//! directories. Both are loaded once and passed down by reference.

use crate::gate::GateOptions;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_DOWNLOAD_CONFIG: &str = "phyboard_image.yaml";
pub const DEFAULT_DIRECTORIES_FILE: &str = "flash_directories.config";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

fn default_tftp_path() -> PathBuf {
    PathBuf::from("/srv/tftp")
}

fn default_remote_host() -> String {
    "ls-strontium.phytec".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub image_extensions: Vec<String>,
    #[serde(default)]
    pub tftp_files: Vec<String>,
    #[serde(default = "default_tftp_path")]
    pub tftp_path: PathBuf,
    #[serde(default = "default_remote_host")]
    pub remote_host: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            image_extensions: Vec::new(),
            tftp_files: Vec::new(),
            tftp_path: default_tftp_path(),
            remote_host: default_remote_host(),
        }
    }
}

/// One image set produced on the build host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    pub description: String,
    pub source_path: String,
    pub base_filename: String,
    pub destination_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DownloaderConfig {
    #[serde(default)]
    pub system_config: SystemConfig,
    pub image_configs: Vec<ImageConfig>,
}

impl DownloaderConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_yaml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

/// Everything the flash session needs, resolved from CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashSettings {
    pub directories: Vec<PathBuf>,
    pub gate: GateOptions,
}

/// Image directories, one per line. Blank lines and `#` comments are skipped.
pub fn parse_directories(content: &str) -> Vec<PathBuf> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect()
}

pub fn read_directories(path: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound(path.to_path_buf())
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    Ok(parse_directories(&content))
}

/// `flash_directories.config` beside the executable, else in the working directory.
pub fn default_directories_file() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_DIRECTORIES_FILE)))
        .filter(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DIRECTORIES_FILE))
}
