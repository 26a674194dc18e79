// src/exec/mod.rs

//! Process execution: the process handle contract, its tokio implementation
//! and the launcher that wires spawned processes into the registry.

pub mod launcher;
pub mod process;
pub mod tokio_process;
pub mod workspace;

pub use launcher::{Launcher, ProcessEvent, ProcessEventSink, RunRequest, RunResult};
pub use process::{DataCallback, ExitCallback, ProcessHandle, ProcessSpawner, SpawnRequest};
pub use tokio_process::TokioProcessSpawner;
