mod common;

use std::fs;

use common::TestResult;
use runboard::fs::RealFileSystem;
use runboard::status::Chunk;
use runboard::status::stats::{
    parse_size, parse_stats, read_stats_file, stats_from_chunks, stats_path,
};

#[test]
fn parse_size_understands_decimal_units_in_any_case() {
    assert_eq!(parse_size("381 kB"), 381_000);
    assert_eq!(parse_size("7.57 MB"), 7_570_000);
    assert_eq!(parse_size("12 b"), 12);
    assert_eq!(parse_size("1.5GB"), 1_500_000_000);
    assert_eq!(parse_size("n/a"), 0);
}

#[test]
fn chunk_sizes_become_bundles() {
    let chunks = vec![
        Chunk {
            name: "main".to_string(),
            file: "main.js".to_string(),
            size: "381 kB".to_string(),
            chunk_type: "initial".to_string(),
        },
        Chunk {
            name: "styles".to_string(),
            file: "styles.js".to_string(),
            size: "16.3 kB".to_string(),
            chunk_type: "initial".to_string(),
        },
    ];

    let stats = stats_from_chunks(&chunks);

    assert_eq!(stats.bundles.len(), 2);
    assert_eq!(stats.summary.assets.parsed, 397_300);
}

#[test]
fn stats_file_excludes_maps_and_itself() -> TestResult {
    let stats = parse_stats(
        r#"{"assets":[
            {"name":"main.js","size":10},
            {"name":"main.js.map","size":99},
            {"name":"stats.json","size":5},
            {"name":"index.html","size":2}
        ]}"#,
    )?;

    let files: Vec<_> = stats.assets.iter().map(|a| a.file.as_str()).collect();
    assert_eq!(files, vec!["main.js", "index.html"]);
    assert_eq!(stats.bundles.len(), 1);
    assert_eq!(stats.summary.assets.parsed, 12);
    assert_eq!(stats.summary.modules, 0);
    Ok(())
}

#[test]
fn malformed_stats_file_is_an_error() {
    assert!(parse_stats("{ not json").is_err());
}

#[test]
fn stats_file_is_read_from_output_directory_on_disk() -> TestResult {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("dist").join("app");
    fs::create_dir_all(&out)?;
    fs::write(
        out.join("stats.json"),
        r#"{"assets":[{"name":"main.js","size":2048}],"modules":[{"name":"./node_modules/a.js","size":7}]}"#,
    )?;

    let path = stats_path(dir.path(), "dist/app");
    let stats = read_stats_file(&RealFileSystem, &path)?;

    assert_eq!(stats.summary.assets.parsed, 2048);
    assert_eq!(stats.summary.dependencies, 7);
    Ok(())
}

#[test]
fn missing_stats_file_is_an_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = stats_path(dir.path(), "dist");
    assert!(read_stats_file(&RealFileSystem, &path).is_err());
    Ok(())
}
