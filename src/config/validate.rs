// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, RunboardError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RunboardError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.registry, raw.executable))
    }
}

/// Validate an already-built `ConfigFile`, e.g. after CLI overrides.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_raw_config(&RawConfigFile {
        registry: cfg.registry.clone(),
        executable: cfg.executable.clone(),
    })
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_registry(cfg)?;
    validate_executable(cfg)?;
    Ok(())
}

fn validate_registry(cfg: &RawConfigFile) -> Result<()> {
    let registry = &cfg.registry;

    if registry.max_recent == 0 {
        return Err(RunboardError::ConfigurationError(
            "[registry].max_recent must be >= 1 (got 0)".to_string(),
        ));
    }
    if registry.max_history == 0 {
        return Err(RunboardError::ConfigurationError(
            "[registry].max_history must be >= 1 (got 0)".to_string(),
        ));
    }
    if registry.max_history < registry.max_recent {
        return Err(RunboardError::ConfigurationError(format!(
            "[registry].max_history ({}) must be >= max_recent ({})",
            registry.max_history, registry.max_recent
        )));
    }

    Ok(())
}

fn validate_executable(cfg: &RawConfigFile) -> Result<()> {
    let exe = &cfg.executable;

    if exe.name.trim().is_empty() {
        return Err(RunboardError::ConfigurationError(
            "[executable].name must not be empty".to_string(),
        ));
    }
    if exe.version_selector_program.trim().is_empty() {
        return Err(RunboardError::ConfigurationError(
            "[executable].version_selector_program must not be empty".to_string(),
        ));
    }

    Ok(())
}
