#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use runboard::config::{ConfigFile, ExecutableConfig, RawConfigFile, RegistrySection};
use runboard::exec::{ProcessSpawner, RunRequest, SpawnRequest};
use runboard::registry::{NewCommand, RecordKey, SpawnFactory};
use runboard::status::{DetailedStatusCalculator, NoopStatusCalculator};
use runboard::types::{CommandKind, VersionSelectorMode};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                registry: RegistrySection::default(),
                executable: ExecutableConfig {
                    path: Some(PathBuf::from("/usr/local/bin/ng")),
                    version_selector: VersionSelectorMode::Never,
                    ..ExecutableConfig::default()
                },
            },
        }
    }

    pub fn max_recent(mut self, n: usize) -> Self {
        self.config.registry.max_recent = n;
        self
    }

    pub fn max_history(mut self, n: usize) -> Self {
        self.config.registry.max_history = n;
        self
    }

    pub fn detailed_status(mut self, val: bool) -> Self {
        self.config.registry.detailed_status = val;
        self
    }

    pub fn executable_name(mut self, name: &str) -> Self {
        self.config.executable.name = name.to_string();
        self
    }

    pub fn executable_path(mut self, path: Option<&str>) -> Self {
        self.config.executable.path = path.map(PathBuf::from);
        self
    }

    pub fn version_selector(mut self, mode: VersionSelectorMode) -> Self {
        self.config.executable.version_selector = mode;
        self
    }

    pub fn wsl(mut self, val: bool) -> Self {
        self.config.executable.wsl = val;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RunRequest`.
pub struct RunRequestBuilder {
    request: RunRequest,
}

impl RunRequestBuilder {
    pub fn new(args: &[&str]) -> Self {
        Self {
            request: RunRequest {
                kind: CommandKind::Ng,
                cwd: PathBuf::from("/work/app"),
                args: args.iter().map(|a| a.to_string()).collect(),
                track_in_recent: true,
            },
        }
    }

    pub fn kind(mut self, kind: CommandKind) -> Self {
        self.request.kind = kind;
        self
    }

    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.request.cwd = cwd.as_ref().to_path_buf();
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.request.track_in_recent = false;
        self
    }

    pub fn build(self) -> RunRequest {
        self.request
    }
}

/// Builder for registry-level `NewCommand`s backed by a spawner whose
/// process callbacks are ignored; tests drive the registry directly.
pub struct NewCommandBuilder {
    id: String,
    kind: CommandKind,
    workspace: Option<String>,
    calculator: Box<dyn DetailedStatusCalculator>,
    spawner: Arc<dyn ProcessSpawner>,
    track_in_recent: bool,
}

impl NewCommandBuilder {
    pub fn new(id: &str, spawner: Arc<dyn ProcessSpawner>) -> Self {
        Self {
            id: id.to_string(),
            kind: CommandKind::Ng,
            workspace: Some("app".to_string()),
            calculator: Box::new(NoopStatusCalculator),
            spawner,
            track_in_recent: true,
        }
    }

    pub fn calculator(mut self, calculator: impl DetailedStatusCalculator + 'static) -> Self {
        self.calculator = Box::new(calculator);
        self
    }

    pub fn untracked(mut self) -> Self {
        self.track_in_recent = false;
        self
    }

    pub fn build(self) -> NewCommand {
        let request = SpawnRequest {
            name: self.id.clone(),
            program: "ng".to_string(),
            args: vec![],
            cwd: PathBuf::from("/work/app"),
            display_label: format!("ng {}", self.id),
            dry_run: !self.track_in_recent,
            wsl: false,
        };
        let spawner = self.spawner;
        let factory: SpawnFactory = Arc::new(move |_key: RecordKey| spawner.spawn(request.clone()));

        NewCommand {
            kind: self.kind,
            id: self.id.clone(),
            workspace: self.workspace,
            command: format!("ng {}", self.id),
            factory,
            calculator: self.calculator,
            track_in_recent: self.track_in_recent,
        }
    }
}
