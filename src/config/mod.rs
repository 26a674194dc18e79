// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - TOML-backed data model (`model.rs`).
//! - Loading from disk, with defaults for a missing file (`loader.rs`).
//! - Range checks on registry capacities and executable settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigFile, ExecutableConfig, RawConfigFile, RegistrySection};
pub use validate::validate_config;
