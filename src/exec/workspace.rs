// src/exec/workspace.rs

//! Workspace probing: the label shown next to a command and the status
//! calculator that knows how to read its output.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::fs::{FileSystem, find_upward, read_json};
use crate::status::{
    BuildOptions, BuildStatusCalculator, DetailedStatusCalculator, NoopStatusCalculator,
    TestStatusCalculator,
};
use crate::types::CommandKind;

pub const PACKAGE_MANIFEST: &str = "package.json";

/// Workspace configuration files, in lookup order.
pub const WORKSPACE_FILES: &[&str] = &["angular.json", "workspace.json"];

pub const KARMA_TEST_BUILDERS: &[&str] = &["@angular-devkit/build-angular:karma"];

pub const BUILD_BUILDERS: &[&str] = &[
    "@angular-devkit/build-angular:browser",
    "@angular-devkit/build-angular:dev-server",
    "@nrwl/web:build",
    "@nrwl/web:dev-server",
];

const PRODUCTION_FLAGS: &[&str] = &["--configuration=production", "--prod"];

/// `name` of the closest `package.json` at or above `cwd`.
///
/// `None` for [`CommandKind::New`], which runs before a workspace exists, and
/// whenever the manifest is missing or unreadable.
pub fn workspace_label(fs: &dyn FileSystem, kind: CommandKind, cwd: &Path) -> Option<String> {
    if kind == CommandKind::New {
        return None;
    }

    let manifest = find_upward(fs, cwd, PACKAGE_MANIFEST)?;
    match read_json(fs, &manifest) {
        Ok(json) => json.get("name").and_then(Value::as_str).map(str::to_string),
        Err(e) => {
            debug!(path = ?manifest, error = %e, "unreadable package manifest; no workspace label");
            None
        }
    }
}

/// Pick the calculator for `args` run in `cwd`.
///
/// With a workspace configuration the project's builder decides; without
/// one, the operation name does.
pub fn select_calculator(
    fs: &Arc<dyn FileSystem>,
    cwd: &Path,
    args: &[String],
) -> Box<dyn DetailedStatusCalculator> {
    let operation = args.first().map(String::as_str).unwrap_or_default();
    let is_for_production = args.iter().any(|a| PRODUCTION_FLAGS.contains(&a.as_str()));

    let Some(config) = read_workspace_config(fs.as_ref(), cwd) else {
        return match operation {
            "build" | "serve" => Box::new(BuildStatusCalculator::new(
                BuildOptions {
                    cwd: cwd.to_path_buf(),
                    is_for_production,
                    ..BuildOptions::default()
                },
                Arc::clone(fs),
            )),
            "test" => Box::new(TestStatusCalculator::new()),
            _ => Box::new(NoopStatusCalculator),
        };
    };

    let project = args
        .get(1)
        .filter(|a| !a.starts_with('-'))
        .map(String::as_str)
        .or_else(|| config.get("defaultProject").and_then(Value::as_str));

    let Some(target) = project.and_then(|p| project_target(&config, p, operation)) else {
        debug!(?project, operation, "no architect target; using no-op calculator");
        return Box::new(NoopStatusCalculator);
    };

    let builder = target.get("builder").and_then(Value::as_str).unwrap_or_default();
    if KARMA_TEST_BUILDERS.contains(&builder) {
        return Box::new(TestStatusCalculator::new());
    }

    if BUILD_BUILDERS.contains(&builder) {
        let options = target.get("options");
        let option = |name: &str| {
            options
                .and_then(|o| o.get(name))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        return Box::new(BuildStatusCalculator::new(
            BuildOptions {
                cwd: cwd.to_path_buf(),
                output_path: option("outputPath"),
                index: option("index"),
                is_for_production,
            },
            Arc::clone(fs),
        ));
    }

    debug!(builder, "unsupported builder; using no-op calculator");
    Box::new(NoopStatusCalculator)
}

fn read_workspace_config(fs: &dyn FileSystem, cwd: &Path) -> Option<Value> {
    WORKSPACE_FILES.iter().find_map(|name| {
        let path = cwd.join(name);
        if !fs.is_file(&path) {
            return None;
        }
        read_json(fs, &path)
            .map_err(|e| debug!(path = ?path, error = %e, "unreadable workspace configuration"))
            .ok()
    })
}

/// `projects.<project>.architect.<operation>`, also accepting `targets`.
fn project_target<'a>(config: &'a Value, project: &str, operation: &str) -> Option<&'a Value> {
    let project = config.get("projects")?.get(project)?;
    project
        .get("architect")
        .or_else(|| project.get("targets"))?
        .get(operation)
}
