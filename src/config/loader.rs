//! Configuration loading from files (std only).

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Error, Result};

use super::{validation, MountConfig};

/// Load and validate a mount configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the TOML is invalid, or
/// the values fail the boot checks.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MountConfig> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| {
        let msg = heapless::String::try_from(e.to_string().as_str()).unwrap_or_default();
        Error::Config(ConfigError::IoError(msg))
    })?;

    parse_config(&content)
}

/// Parse and validate a mount configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<MountConfig> {
    let config: MountConfig = toml::from_str(content).map_err(|e| {
        let msg = heapless::String::try_from(e.message()).unwrap_or_default();
        Error::Config(ConfigError::ParseError(msg))
    })?;

    validation::validate(&config)?;
    Ok(config)
}
