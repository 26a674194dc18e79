// src/fs/mod.rs

//! Filesystem access used by the launcher and the build status calculator.
//!
//! The core only ever *reads*: manifest files to label a workspace, the
//! workspace configuration to pick a status calculator, `.nvmrc` probes and the
//! optional build stats artifact. Tests swap in [`mock::MockFileSystem`].

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

/// Abstract read-only filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn is_file(&self, path: &Path) -> bool;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Walk from `start` towards the filesystem root and return the first
/// `start/../file_name` that is a regular file.
pub fn find_upward(fs: &dyn FileSystem, start: &Path, file_name: &str) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(file_name);
        if fs.is_file(&candidate) {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

/// Read and parse a JSON file.
pub fn read_json(fs: &dyn FileSystem, path: &Path) -> Result<serde_json::Value> {
    let contents = fs.read_to_string(path)?;
    serde_json::from_str(&contents).with_context(|| format!("parsing JSON in {:?}", path))
}
