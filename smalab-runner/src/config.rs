//! TOML configuration loading.
//!
//! Every section is optional; missing keys take their defaults. A loaded
//! configuration is always validated before it is returned.

use std::fs;
use std::path::{Path, PathBuf};

use smalab_core::config::{ConfigError, SimConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("cannot write config {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str, origin: &Path) -> Result<SimConfig, ConfigLoadError> {
    let config: SimConfig = toml::from_str(content).map_err(|source| ConfigLoadError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Load `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<SimConfig, ConfigLoadError> {
    let Some(path) = path else {
        let config = SimConfig::default();
        config.validate()?;
        return Ok(config);
    };
    let content = fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&content, path)?;
    tracing::info!(path = %path.display(), hash = %config.config_hash(), "loaded config");
    Ok(config)
}

/// Write `config` as TOML so a later resume can reload it.
pub fn save_config(config: &SimConfig, path: &Path) -> Result<(), ConfigLoadError> {
    let write_err = |reason: String| ConfigLoadError::Write {
        path: path.to_path_buf(),
        reason,
    };
    let content = toml::to_string_pretty(config).map_err(|e| write_err(e.to_string()))?;
    fs::write(path, content).map_err(|e| write_err(e.to_string()))
}
