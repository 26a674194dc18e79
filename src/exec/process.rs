// src/exec/process.rs

//! Process handle contract.
//!
//! The registry never spawns anything itself. It receives handles from a
//! [`ProcessSpawner`]; production uses [`super::TokioProcessSpawner`], tests
//! provide fakes that script output and exit codes.

use std::path::PathBuf;

use anyhow::Result;

/// Receives each output chunk of a process, in order.
pub type DataCallback = Box<dyn FnMut(String) + Send>;

/// Receives the exit code once. Never called for a killed process.
pub type ExitCallback = Box<dyn FnOnce(i32) + Send>;

/// A spawned process with asynchronous output and exit notification.
pub trait ProcessHandle: Send {
    /// Register the output listener.
    ///
    /// Returns `false` when this handle has no live output; the command's
    /// status is then derived from its exit alone. Must be called before
    /// [`ProcessHandle::on_exit`].
    fn on_data(&mut self, _callback: DataCallback) -> bool {
        false
    }

    /// Register the exit listener.
    fn on_exit(&mut self, callback: ExitCallback);

    /// Adjust the terminal width, where the handle has one.
    fn resize(&mut self, _cols: u16) {}

    /// Request termination. Fire-and-forget: nothing waits for the process
    /// to actually go away.
    fn kill(&mut self);
}

/// Everything needed to start one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Run id the process belongs to.
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Human-readable command line shown with the output.
    pub display_label: String,
    /// Not tracked in `recent`; the caller only wants to see what would happen.
    pub dry_run: bool,
    /// Route the invocation through `wsl.exe -e`.
    pub wsl: bool,
}

/// Capability that turns a [`SpawnRequest`] into a live [`ProcessHandle`].
pub trait ProcessSpawner: Send + Sync {
    fn spawn(&self, request: SpawnRequest) -> Result<Box<dyn ProcessHandle>>;
}
