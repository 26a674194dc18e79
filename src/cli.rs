// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::CommandKind;

/// Command-line arguments for `runboard`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runboard",
    version,
    about = "Run a workspace command and follow its output and structured progress.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML). A missing file means defaults.
    #[arg(long, value_name = "PATH", default_value = "Runboard.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNBOARD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Kind of invocation (add, new, generate, npm, ng).
    #[arg(long, value_name = "KIND", default_value = "ng")]
    pub kind: CommandKind,

    /// Working directory of the command. Default: the current directory.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Executable to run; overrides `[executable].path`.
    #[arg(long, value_name = "PATH")]
    pub program: Option<PathBuf>,

    /// How often to poll for new output, in milliseconds.
    #[arg(long, value_name = "N", default_value_t = 200)]
    pub poll_ms: u64,

    /// Print the final detailed status as JSON once the command ends.
    #[arg(long)]
    pub json: bool,

    /// Keep the command out of the recent list.
    #[arg(long)]
    pub dry_run: bool,

    /// Arguments passed to the executable, e.g. `build my-app --prod`.
    #[arg(
        value_name = "ARGS",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
