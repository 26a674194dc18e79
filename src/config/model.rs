// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::registry::{DEFAULT_MAX_HISTORY, DEFAULT_MAX_RECENT, RegistryLimits};
use crate::types::VersionSelectorMode;

/// Configuration exactly as read from a TOML file, before validation.
///
/// ```toml
/// [registry]
/// max_recent = 5
/// max_history = 15
/// detailed_status = true
///
/// [executable]
/// name = "ng"
/// path = "node_modules/.bin/ng"
/// version_selector = "auto"
/// ```
///
/// Every section and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub registry: RegistrySection,

    #[serde(default)]
    pub executable: ExecutableConfig,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub registry: RegistrySection,
    pub executable: ExecutableConfig,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(registry: RegistrySection, executable: ExecutableConfig) -> Self {
        Self {
            registry,
            executable,
        }
    }

    pub fn limits(&self) -> RegistryLimits {
        RegistryLimits {
            max_recent: self.registry.max_recent,
            max_history: self.registry.max_history,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RegistrySection::default(), ExecutableConfig::default())
    }
}

/// `[registry]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySection {
    /// Capacity of the visible working set.
    #[serde(default = "default_max_recent")]
    pub max_recent: usize,

    /// Capacity of the lookup ring.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Include `detailedStatus` in serialized commands.
    #[serde(default = "default_true")]
    pub detailed_status: bool,
}

fn default_max_recent() -> usize {
    DEFAULT_MAX_RECENT
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

fn default_true() -> bool {
    true
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            max_recent: default_max_recent(),
            max_history: default_max_history(),
            detailed_status: true,
        }
    }
}

/// `[executable]` section: the tool commands are run with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutableConfig {
    /// Name used in run ids.
    #[serde(default = "default_executable_name")]
    pub name: String,

    /// Resolved executable. Running without one is a configuration error.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub version_selector: VersionSelectorMode,

    #[serde(default = "default_version_selector_program")]
    pub version_selector_program: String,

    /// Route invocations through `wsl.exe -e`.
    #[serde(default)]
    pub wsl: bool,
}

fn default_executable_name() -> String {
    "ng".to_string()
}

fn default_version_selector_program() -> String {
    "nvm".to_string()
}

impl Default for ExecutableConfig {
    fn default() -> Self {
        Self {
            name: default_executable_name(),
            path: None,
            version_selector: VersionSelectorMode::default(),
            version_selector_program: default_version_selector_program(),
            wsl: false,
        }
    }
}
