// src/status/stats.rs

//! Size statistics attached to a build once it reaches 100%.
//!
//! The preferred source is the `stats.json` artifact a build may leave in its
//! output directory. When that cannot be read, approximate numbers are derived
//! from the chunk summaries already parsed from the build output.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::fs::FileSystem;
use crate::status::build::Chunk;

pub const STATS_FILE_NAME: &str = "stats.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeData {
    pub gzipped: u64,
    pub parsed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetData {
    pub file: String,
    pub sizes: SizeData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub assets: SizeData,
    pub modules: u64,
    pub dependencies: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub assets: Vec<AssetData>,
    pub bundles: Vec<AssetData>,
    pub summary: StatsSummary,
}

/// The subset of the bundler's stats file we care about.
#[derive(Debug, Deserialize)]
struct StatsFile {
    #[serde(default)]
    assets: Vec<StatsEntry>,
    #[serde(default)]
    modules: Vec<StatsEntry>,
}

#[derive(Debug, Deserialize)]
struct StatsEntry {
    name: String,
    #[serde(default)]
    size: u64,
}

/// `<cwd>/<output_path>/stats.json`
pub fn stats_path(cwd: &Path, output_path: &str) -> PathBuf {
    cwd.join(output_path).join(STATS_FILE_NAME)
}

pub fn read_stats_file(fs: &dyn FileSystem, path: &Path) -> Result<BuildStats> {
    let contents = fs.read_to_string(path)?;
    parse_stats(&contents).with_context(|| format!("parsing stats file {:?}", path))
}

/// Build statistics from the JSON contents of a stats file. Totals saturate
/// at `u64::MAX`.
pub fn parse_stats(json: &str) -> Result<BuildStats> {
    let raw: StatsFile = serde_json::from_str(json)?;
    let mut stats = BuildStats::default();

    for asset in raw.assets.iter().filter(|a| !is_excluded_asset(&a.name)) {
        let data = AssetData {
            file: asset.name.clone(),
            sizes: SizeData {
                gzipped: 0,
                parsed: asset.size,
            },
        };
        stats.summary.assets.parsed = stats.summary.assets.parsed.saturating_add(asset.size);
        if asset.name.ends_with(".js") {
            stats.bundles.push(data.clone());
        }
        stats.assets.push(data);
    }

    for module in &raw.modules {
        stats.summary.modules = stats.summary.modules.saturating_add(module.size);
        if module.name.contains("node_modules") {
            stats.summary.dependencies = stats.summary.dependencies.saturating_add(module.size);
        }
    }

    Ok(stats)
}

/// Approximate statistics from the chunk summaries printed by the build.
pub fn stats_from_chunks(chunks: &[Chunk]) -> BuildStats {
    let mut stats = BuildStats::default();

    for chunk in chunks {
        let size = parse_size(&chunk.size);
        let data = AssetData {
            file: chunk.file.clone(),
            sizes: SizeData {
                gzipped: 0,
                parsed: size,
            },
        };
        stats.summary.assets.parsed = stats.summary.assets.parsed.saturating_add(size);
        stats.summary.modules = stats.summary.modules.saturating_add(size);
        stats.bundles.push(data.clone());
        stats.assets.push(data);
    }

    stats
}

static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([\d.]+)\s*(gb|mb|kb|b)\b").expect("size pattern is valid")
});

/// Parse a human size like `"381 kB"` or `"7.57 MB"` into bytes (decimal units).
/// Unparseable input yields 0.
pub fn parse_size(s: &str) -> u64 {
    let Some(caps) = SIZE_RE.captures(s) else {
        return 0;
    };
    let Ok(value) = caps[1].parse::<f64>() else {
        return 0;
    };
    let factor = match caps[2].to_lowercase().as_str() {
        "b" => 1.0,
        "kb" => 1_000.0,
        "mb" => 1_000_000.0,
        "gb" => 1_000_000_000.0,
        _ => 0.0,
    };
    (value * factor).round() as u64
}

fn is_excluded_asset(name: &str) -> bool {
    name == STATS_FILE_NAME || name.ends_with(".map")
}
