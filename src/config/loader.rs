//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::BalancerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Config file locations searched when no `--config` flag is given.
pub const SEARCH_PATHS: [&str; 2] = ["./config.toml", "/etc/dnsbalancer/config.toml"];

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<BalancerConfig, ConfigError> {
    let config: BalancerConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    parse_config(&read_file(path)?)
}

/// Read and deserialize a TOML file without semantic validation.
pub fn read_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    Ok(toml::from_str(&read_file(path)?)?)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve the config file: the explicit flag first, then [`SEARCH_PATHS`].
pub fn find_config_file(flag: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = flag {
        return Some(path.to_path_buf());
    }
    SEARCH_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

/// Read the given file, or fall back to defaults when there is none.
///
/// Nothing is validated here; callers validate after applying command-line
/// overrides.
pub fn load_or_default(path: Option<&Path>) -> Result<BalancerConfig, ConfigError> {
    match path {
        Some(path) if path.exists() => read_config(path),
        _ => Ok(BalancerConfig::default()),
    }
}

/// Write the example configuration as TOML.
pub fn save_example(path: &Path) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(&BalancerConfig::example())?;
    fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
