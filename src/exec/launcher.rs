// src/exec/launcher.rs

//! Command launcher: turns a run request into a registered, started command.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ExecutableConfig;
use crate::errors::{Result, RunboardError};
use crate::fs::FileSystem;
use crate::registry::{CommandRegistry, NewCommand, RecordKey, SpawnFactory};
use crate::types::{CommandKind, VersionSelectorMode};

use super::process::{ProcessSpawner, SpawnRequest};
use super::workspace::{select_calculator, workspace_label};

/// Marker file that pins a runtime version for a directory.
pub const VERSION_FILE: &str = ".nvmrc";

/// Notification from a running process, tagged with the record it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Output { key: RecordKey, text: String },
    Exited { key: RecordKey, code: i32 },
}

/// Where process callbacks deliver their events. Must not block.
pub type ProcessEventSink = Arc<dyn Fn(ProcessEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub kind: CommandKind,
    pub cwd: PathBuf,
    pub args: Vec<String>,
    /// `false` for dry runs: the command is kept in history only.
    pub track_in_recent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub id: String,
}

pub struct Launcher {
    executable: ExecutableConfig,
    spawner: Arc<dyn ProcessSpawner>,
    fs: Arc<dyn FileSystem>,
    sink: ProcessEventSink,
    run_index: u64,
}

impl fmt::Debug for Launcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Launcher")
            .field("executable", &self.executable)
            .field("run_index", &self.run_index)
            .finish_non_exhaustive()
    }
}

impl Launcher {
    pub fn new(
        executable: ExecutableConfig,
        spawner: Arc<dyn ProcessSpawner>,
        fs: Arc<dyn FileSystem>,
        sink: ProcessEventSink,
    ) -> Self {
        Self {
            executable,
            spawner,
            fs,
            sink,
            run_index: 0,
        }
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.executable.path = Some(path.into());
    }

    /// Register and start one command, returning its run id.
    ///
    /// Fails with [`RunboardError::ConfigurationError`] before touching the
    /// registry when no executable path has been resolved.
    pub fn run(&mut self, registry: &mut CommandRegistry, request: RunRequest) -> Result<RunResult> {
        let path = self.executable.path.clone().ok_or_else(|| {
            RunboardError::ConfigurationError(format!(
                "no path resolved for executable '{}'",
                self.executable.name
            ))
        })?;
        let path = path.display().to_string();

        let workspace = workspace_label(self.fs.as_ref(), request.kind, &request.cwd);
        let calculator = select_calculator(&self.fs, &request.cwd, &request.args);

        let joined = request.args.join(" ");
        let id = format!("{} {} {}", self.executable.name, joined, self.run_index);
        self.run_index += 1;

        let (program, args, command) = if self.uses_version_selector(&request.cwd) {
            let selector = self.executable.version_selector_program.clone();
            let command = format!("{selector} exec {path} {joined}");
            let mut args = vec!["exec".to_string(), path];
            args.extend(request.args.iter().cloned());
            (selector, args, command)
        } else {
            let command = format!("{path} {joined}");
            (path, request.args.clone(), command)
        };

        let spawn_request = SpawnRequest {
            name: id.clone(),
            program,
            args,
            cwd: request.cwd.clone(),
            display_label: command.clone(),
            dry_run: !request.track_in_recent,
            wsl: self.executable.wsl,
        };
        debug!(?spawn_request, "resolved invocation");

        let key = registry.add(NewCommand {
            kind: request.kind,
            id: id.clone(),
            workspace,
            command,
            factory: self.factory(spawn_request),
            calculator,
            track_in_recent: request.track_in_recent,
        })?;
        registry.start_record(key)?;

        info!(command = %id, "command launched");
        Ok(RunResult { id })
    }

    /// Version selector indirection is not supported on Windows.
    fn uses_version_selector(&self, cwd: &Path) -> bool {
        if cfg!(windows) {
            return false;
        }
        match self.executable.version_selector {
            VersionSelectorMode::Always => true,
            VersionSelectorMode::Never => false,
            VersionSelectorMode::Auto => self.fs.is_file(&cwd.join(VERSION_FILE)),
        }
    }

    /// Spawn factory wiring the process callbacks to the event sink under the
    /// key of the record being started.
    fn factory(&self, request: SpawnRequest) -> SpawnFactory {
        let spawner = Arc::clone(&self.spawner);
        let sink = Arc::clone(&self.sink);

        Arc::new(move |key: RecordKey| {
            let mut handle = spawner.spawn(request.clone())?;

            let data_sink = Arc::clone(&sink);
            let live = handle.on_data(Box::new(move |text| {
                data_sink(ProcessEvent::Output { key, text });
            }));
            if !live {
                debug!(command = %request.name, %key, "process has no live output");
            }

            let exit_sink = Arc::clone(&sink);
            handle.on_exit(Box::new(move |code| {
                exit_sink(ProcessEvent::Exited { key, code });
            }));

            Ok(handle)
        })
    }
}
