// src/config/loader.rs

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// the checked configuration.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load and validate a configuration file.
///
/// A missing file is not an error: the defaults apply. A file that exists
/// but does not parse or validate is.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = match load_from_path(path) {
        Ok(raw) => raw,
        Err(crate::errors::RunboardError::IoError(e)) if e.kind() == io::ErrorKind::NotFound => {
            debug!(?path, "no config file; using defaults");
            RawConfigFile::default()
        }
        Err(e) => return Err(e),
    };
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}
