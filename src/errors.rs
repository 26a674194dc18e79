// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunboardError {
    /// `recent` is full and holds no finished command that could be evicted.
    #[error("Cannot run more than {capacity} commands in parallel")]
    ResourceExhausted { capacity: usize },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Failed to spawn command '{id}': {reason}")]
    SpawnFailed { id: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RunboardError>;
