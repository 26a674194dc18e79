// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod registry;
pub mod status;
pub mod types;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::engine::{CommandService, ServiceHandle};
use crate::exec::{RunRequest, TokioProcessSpawner};
use crate::fs::RealFileSystem;
use crate::types::CommandStatus;

/// High-level entry point used by `main.rs`.
///
/// Loads the config, starts the command service, runs one command and
/// relays its output until it ends. Returns the final command status.
pub async fn run(args: CliArgs) -> Result<CommandStatus> {
    let mut cfg = load_and_validate(&args.config)?;
    if let Some(program) = args.program {
        cfg.executable.path = Some(program);
    }

    let cwd = match args.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let (service, handle) =
        CommandService::new(&cfg, Arc::new(TokioProcessSpawner), Arc::new(RealFileSystem));
    let service_task = tokio::spawn(service.run());

    let run = handle
        .run(RunRequest {
            kind: args.kind,
            cwd,
            args: args.args,
            track_in_recent: !args.dry_run,
        })
        .await?;
    info!(command = %run.id, "command running");

    // Ctrl-C → stop the command; the follow loop then sees `terminated`.
    {
        let handle = handle.clone();
        let id = run.id.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!(command = %id, "Ctrl+C received; stopping command");
            if let Err(e) = handle.stop(&id).await {
                warn!(command = %id, error = %e, "failed to stop command");
            }
        });
    }

    let status = follow(&handle, &run.id, Duration::from_millis(args.poll_ms), args.json).await?;

    handle.shutdown();
    service_task.await??;
    Ok(status)
}

/// Poll one command, relaying new output to stdout until it reaches a
/// terminal status.
async fn follow(
    handle: &ServiceHandle,
    id: &str,
    poll: Duration,
    json: bool,
) -> Result<CommandStatus> {
    let mut ticker = tokio::time::interval(poll.max(Duration::from_millis(1)));
    let mut stdout = std::io::stdout();

    loop {
        ticker.tick().await;

        let Some(command) = handle.get(id).await? else {
            bail!("command '{id}' is no longer tracked");
        };

        if !command.out_chunk.is_empty() {
            stdout.write_all(command.out_chunk.as_bytes())?;
            stdout.flush()?;
        }

        if command.status.is_terminal() {
            if json {
                writeln!(
                    stdout,
                    "{}",
                    serde_json::to_string_pretty(&command.detailed_status)?
                )?;
            }
            info!(command = %id, status = %command.status, "command ended");
            return Ok(command.status);
        }
    }
}
