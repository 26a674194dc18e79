mod common;

use std::sync::{Arc, Mutex};

use common::{TestResult, mock_fs};
use runboard::config::ExecutableConfig;
use runboard::errors::RunboardError;
use runboard::exec::{Launcher, ProcessEvent, ProcessEventSink};
use runboard::fs::mock::MockFileSystem;
use runboard::registry::{CommandRegistry, Pool, RegistryLimits};
use runboard::status::{BuildStatus, DetailedStatus};
use runboard::types::{CommandKind, CommandStatus, VersionSelectorMode};
use runboard_test_utils::builders::{ConfigFileBuilder, RunRequestBuilder};
use runboard_test_utils::fake_spawner::FakeSpawner;
use runboard_test_utils::init_tracing;

const ANGULAR_JSON: &str = r#"{
  "defaultProject": "shop",
  "projects": {
    "shop": {
      "architect": {
        "build": {
          "builder": "@angular-devkit/build-angular:browser",
          "options": { "outputPath": "dist/shop", "index": "src/index.html" }
        },
        "test": { "builder": "@angular-devkit/build-angular:karma" },
        "lint": { "builder": "@angular-devkit/build-angular:tslint" }
      }
    },
    "admin": {
      "targets": {
        "serve": { "builder": "@nrwl/web:dev-server", "options": {} }
      }
    }
  }
}"#;

struct Harness {
    launcher: Launcher,
    registry: CommandRegistry,
    spawner: Arc<FakeSpawner>,
    fs: MockFileSystem,
    events: Arc<Mutex<Vec<ProcessEvent>>>,
}

impl Harness {
    fn new() -> Self {
        Self::with_executable(ConfigFileBuilder::new().build().executable)
    }

    fn with_executable(executable: ExecutableConfig) -> Self {
        init_tracing();
        let (mock, fs) = mock_fs();
        let spawner = Arc::new(FakeSpawner::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        let sink: ProcessEventSink = Arc::new(move |event| {
            sink_events.lock().unwrap().push(event);
        });

        Self {
            launcher: Launcher::new(executable, spawner.clone(), fs, sink),
            registry: CommandRegistry::new(RegistryLimits::default()),
            spawner,
            fs: mock,
            events,
        }
    }

    fn run(&mut self, args: &[&str]) -> runboard::errors::Result<String> {
        self.launcher
            .run(&mut self.registry, RunRequestBuilder::new(args).build())
            .map(|r| r.id)
    }

    fn detailed(&self, id: &str) -> Option<DetailedStatus> {
        self.registry.find(id, Pool::History)?.detailed_status()
    }
}

#[test]
fn missing_executable_path_fails_before_registering() {
    let mut h = Harness::with_executable(
        ConfigFileBuilder::new().executable_path(None).build().executable,
    );

    let err = h.run(&["build"]).expect_err("no path configured");

    assert!(matches!(err, RunboardError::ConfigurationError(_)));
    assert_eq!(h.registry.history_len(), 0);
    assert_eq!(h.spawner.spawn_count(), 0);
}

#[test]
fn set_path_resolves_the_executable_later() -> TestResult {
    let mut h = Harness::with_executable(
        ConfigFileBuilder::new().executable_path(None).build().executable,
    );
    h.launcher.set_path("/opt/ng");

    h.run(&["build"])?;

    assert_eq!(h.spawner.last().ok_or("nothing spawned")?.request().program, "/opt/ng");
    Ok(())
}

#[test]
fn run_ids_join_name_args_and_a_counter() -> TestResult {
    let mut h = Harness::new();

    assert_eq!(h.run(&["build", "--prod"])?, "ng build --prod 0");
    assert_eq!(h.run(&["build", "--prod"])?, "ng build --prod 1");
    assert_eq!(h.run(&["lint"])?, "ng lint 2");
    assert_eq!(h.spawner.requests().len(), 3);
    Ok(())
}

#[test]
fn run_ids_use_the_configured_executable_name() -> TestResult {
    let mut h = Harness::with_executable(
        ConfigFileBuilder::new().executable_name("nx").build().executable,
    );

    assert_eq!(h.run(&["build", "shop"])?, "nx build shop 0");
    Ok(())
}

#[test]
fn run_registers_and_starts_the_command() -> TestResult {
    let mut h = Harness::new();

    let id = h.run(&["serve", "--port", "4300"])?;

    let record = h.registry.find(&id, Pool::Recent).ok_or("not in recent")?;
    assert_eq!(record.status, CommandStatus::InProgress);
    assert_eq!(record.kind, CommandKind::Ng);
    assert_eq!(record.command, "/usr/local/bin/ng serve --port 4300");

    let request = h.spawner.last().ok_or("nothing spawned")?.request().clone();
    assert_eq!(request.name, id);
    assert_eq!(request.program, "/usr/local/bin/ng");
    assert_eq!(request.args, vec!["serve", "--port", "4300"]);
    assert_eq!(request.cwd.to_str(), Some("/work/app"));
    assert!(!request.dry_run);
    assert!(!request.wsl);
    Ok(())
}

#[test]
fn dry_run_is_kept_out_of_recent() -> TestResult {
    let mut h = Harness::new();

    let id = h
        .launcher
        .run(
            &mut h.registry,
            RunRequestBuilder::new(&["generate", "component", "x"]).dry_run().build(),
        )?
        .id;

    assert!(h.registry.recent_ids().is_empty());
    assert_eq!(h.registry.status_of(&id), Some(CommandStatus::InProgress));
    assert!(h.spawner.last().ok_or("nothing spawned")?.request().dry_run);
    Ok(())
}

#[test]
fn wsl_flag_is_forwarded_to_the_spawner() -> TestResult {
    let mut h = Harness::with_executable(ConfigFileBuilder::new().wsl(true).build().executable);

    h.run(&["build"])?;

    assert!(h.spawner.last().ok_or("nothing spawned")?.request().wsl);
    Ok(())
}

#[test]
fn workspace_label_comes_from_closest_package_manifest() -> TestResult {
    let mut h = Harness::new();
    h.fs.add_file("/work/package.json", r#"{"name": "monorepo"}"#);

    let id = h.run(&["build"])?;
    let record = h.registry.find(&id, Pool::History).ok_or("missing")?;
    assert_eq!(record.workspace.as_deref(), Some("monorepo"));

    h.fs.add_file("/work/app/package.json", r#"{"name": "app"}"#);
    let id = h.run(&["build"])?;
    let record = h.registry.find(&id, Pool::History).ok_or("missing")?;
    assert_eq!(record.workspace.as_deref(), Some("app"));
    Ok(())
}

#[test]
fn manifest_lookup_skips_directories_with_the_manifest_name() -> TestResult {
    let mut h = Harness::new();
    h.fs.add_file("/work/package.json", r#"{"name": "monorepo"}"#);
    h.fs.add_file("/work/app/package.json/README.md", "not a manifest");

    let id = h.run(&["build"])?;

    let record = h.registry.find(&id, Pool::History).ok_or("missing")?;
    assert_eq!(record.workspace.as_deref(), Some("monorepo"));
    Ok(())
}

#[test]
fn workspace_label_follows_the_request_cwd() -> TestResult {
    let mut h = Harness::new();
    h.fs.add_file("/work/app/package.json", r#"{"name": "app"}"#);
    h.fs.add_file("/srv/admin/package.json", r#"{"name": "admin"}"#);

    let id = h
        .launcher
        .run(
            &mut h.registry,
            RunRequestBuilder::new(&["build"]).cwd("/srv/admin/src").build(),
        )?
        .id;

    let record = h.registry.find(&id, Pool::History).ok_or("missing")?;
    assert_eq!(record.workspace.as_deref(), Some("admin"));
    let request = h.spawner.last().ok_or("nothing spawned")?.request().clone();
    assert_eq!(request.cwd.to_str(), Some("/srv/admin/src"));
    Ok(())
}

#[test]
fn new_commands_and_missing_manifests_have_no_workspace() -> TestResult {
    let mut h = Harness::new();

    let id = h.run(&["build"])?;
    assert!(h.registry.find(&id, Pool::History).ok_or("missing")?.workspace.is_none());

    h.fs.add_file("/work/app/package.json", r#"{"name": "app"}"#);
    let id = h
        .launcher
        .run(
            &mut h.registry,
            RunRequestBuilder::new(&["new", "shop"]).kind(CommandKind::New).build(),
        )?
        .id;
    let record = h.registry.find(&id, Pool::History).ok_or("missing")?;
    assert!(record.workspace.is_none());
    assert_eq!(record.kind, CommandKind::New);
    Ok(())
}

#[test]
fn without_workspace_config_the_operation_picks_the_calculator() -> TestResult {
    let mut h = Harness::new();

    let build = h.run(&["build"])?;
    let serve = h.run(&["serve"])?;
    let test = h.run(&["test"])?;
    let lint = h.run(&["lint"])?;

    assert!(matches!(h.detailed(&build), Some(DetailedStatus::Build(_))));
    assert!(matches!(h.detailed(&serve), Some(DetailedStatus::Build(_))));
    assert!(matches!(h.detailed(&test), Some(DetailedStatus::Test(_))));
    assert!(h.detailed(&lint).is_none());
    Ok(())
}

#[test]
fn builder_of_default_project_picks_the_calculator() -> TestResult {
    let mut h = Harness::new();
    h.fs.add_file("/work/app/angular.json", ANGULAR_JSON);

    let build = h.run(&["build", "--prod"])?;
    let test = h.run(&["test"])?;
    let lint = h.run(&["lint"])?;

    match h.detailed(&build) {
        Some(DetailedStatus::Build(status)) => {
            assert_eq!(status.build_status, BuildStatus::Pending);
            assert_eq!(status.output_path.as_deref(), Some("/work/app/dist/shop"));
        }
        other => panic!("expected build status, got {other:?}"),
    }
    assert!(matches!(h.detailed(&test), Some(DetailedStatus::Test(_))));
    assert!(h.detailed(&lint).is_none());
    Ok(())
}

#[test]
fn explicit_project_and_targets_key_are_honoured() -> TestResult {
    let mut h = Harness::new();
    h.fs.add_file("/work/app/workspace.json", ANGULAR_JSON);

    let admin = h.run(&["serve", "admin"])?;
    let shop_serve = h.run(&["serve"])?;

    assert!(matches!(h.detailed(&admin), Some(DetailedStatus::Build(_))));
    // `shop` has no serve target.
    assert!(h.detailed(&shop_serve).is_none());
    Ok(())
}

#[test]
fn unreadable_workspace_config_falls_back_to_operation() -> TestResult {
    let mut h = Harness::new();
    h.fs.add_file("/work/app/angular.json", "{ not json");

    let test = h.run(&["test"])?;

    assert!(matches!(h.detailed(&test), Some(DetailedStatus::Test(_))));
    Ok(())
}

#[cfg(not(windows))]
#[test]
fn version_file_wraps_invocation_in_selector() -> TestResult {
    let mut h = Harness::with_executable(
        ConfigFileBuilder::new()
            .version_selector(VersionSelectorMode::Auto)
            .build()
            .executable,
    );

    h.run(&["build"])?;
    let plain = h.spawner.last().ok_or("nothing spawned")?.request().clone();
    assert_eq!(plain.program, "/usr/local/bin/ng");

    h.fs.add_file("/work/app/.nvmrc", "18\n");
    let id = h.run(&["build", "--prod"])?;
    let wrapped = h.spawner.last().ok_or("nothing spawned")?.request().clone();

    assert_eq!(wrapped.program, "nvm");
    assert_eq!(wrapped.args, vec!["exec", "/usr/local/bin/ng", "build", "--prod"]);
    assert_eq!(wrapped.display_label, "nvm exec /usr/local/bin/ng build --prod");
    let record = h.registry.find(&id, Pool::History).ok_or("missing")?;
    assert_eq!(record.command, "nvm exec /usr/local/bin/ng build --prod");
    Ok(())
}

#[cfg(not(windows))]
#[test]
fn selector_mode_always_and_never_ignore_the_version_file() -> TestResult {
    let mut always = Harness::with_executable(
        ConfigFileBuilder::new()
            .version_selector(VersionSelectorMode::Always)
            .build()
            .executable,
    );
    always.run(&["build"])?;
    assert_eq!(always.spawner.last().ok_or("nothing spawned")?.request().program, "nvm");

    let mut never = Harness::new();
    never.fs.add_file("/work/app/.nvmrc", "18\n");
    never.run(&["build"])?;
    assert_eq!(
        never.spawner.last().ok_or("nothing spawned")?.request().program,
        "/usr/local/bin/ng"
    );
    Ok(())
}

#[test]
fn process_callbacks_reach_the_sink_with_the_record_key() -> TestResult {
    let mut h = Harness::new();
    let id = h.run(&["build"])?;
    let key = h.registry.find(&id, Pool::Recent).ok_or("missing")?.key;
    let process = h.spawner.last().ok_or("nothing spawned")?;

    process.emit("10% building\n");
    process.exit(0);

    assert_eq!(
        *h.events.lock().unwrap(),
        vec![
            ProcessEvent::Output {
                key,
                text: "10% building\n".to_string()
            },
            ProcessEvent::Exited { key, code: 0 },
        ]
    );
    Ok(())
}

#[test]
fn process_without_live_output_still_reports_exit() -> TestResult {
    init_tracing();
    let (_mock, fs) = mock_fs();
    let spawner = Arc::new(FakeSpawner::without_live_output());
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = Arc::clone(&events);
    let sink: ProcessEventSink = Arc::new(move |event| sink_events.lock().unwrap().push(event));
    let mut launcher = Launcher::new(
        ConfigFileBuilder::new().build().executable,
        spawner.clone(),
        fs,
        sink,
    );
    let mut registry = CommandRegistry::new(RegistryLimits::default());

    launcher.run(&mut registry, RunRequestBuilder::new(&["lint"]).build())?;
    let process = spawner.last().ok_or("nothing spawned")?;
    process.emit("never delivered\n");
    process.exit(1);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ProcessEvent::Exited { code: 1, .. }));
    Ok(())
}

#[test]
fn spawn_failure_is_reported_and_recorded() -> TestResult {
    let mut h = Harness::new();
    h.spawner.fail_next("ng: command not found");

    let err = h.run(&["build"]).expect_err("spawn fails");

    assert!(matches!(err, RunboardError::SpawnFailed { .. }));
    let record = h.registry.find("ng build 0", Pool::Recent).ok_or("missing")?;
    assert_eq!(record.status, CommandStatus::Failed);
    assert!(record.out.contains("ng: command not found"));
    Ok(())
}

#[test]
fn full_recent_rejects_the_run() -> TestResult {
    let mut h = Harness::new();
    for _ in 0..5 {
        h.run(&["serve"])?;
    }

    let err = h.run(&["serve"]).expect_err("recent is full");

    assert!(matches!(err, RunboardError::ResourceExhausted { capacity: 5 }));
    assert_eq!(h.spawner.spawn_count(), 5);
    Ok(())
}
