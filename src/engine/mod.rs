// src/engine/mod.rs

//! Single-owner service around the command registry.
//!
//! The registry is plain synchronous state. [`CommandService`] owns it
//! together with the [`crate::exec::Launcher`] and applies every mutation in
//! the order events arrive on one channel:
//!
//! - process output and exits, delivered by process callbacks
//! - requests from [`ServiceHandle`] clients
//! - shutdown
//!
//! Output chunks of one process therefore reach its buffers and calculator
//! strictly in arrival order.

use tokio::sync::oneshot;

use crate::errors::Result;
use crate::exec::{ProcessEvent, RunRequest, RunResult};
use crate::registry::{RecordKey, SerializedCommand};

pub mod handle;
pub mod service;

pub use handle::ServiceHandle;
pub use service::CommandService;

/// Everything the service loop reacts to.
#[derive(Debug)]
pub enum ServiceEvent {
    /// A process printed something.
    Output { key: RecordKey, text: String },
    /// A process exited on its own.
    Exited { key: RecordKey, code: i32 },
    Request(ServiceRequest),
    /// Stop all recent commands and leave the loop.
    Shutdown,
}

impl From<ProcessEvent> for ServiceEvent {
    fn from(event: ProcessEvent) -> Self {
        match event {
            ProcessEvent::Output { key, text } => ServiceEvent::Output { key, text },
            ProcessEvent::Exited { key, code } => ServiceEvent::Exited { key, code },
        }
    }
}

/// Client request with its reply channel.
#[derive(Debug)]
pub enum ServiceRequest {
    Run {
        request: RunRequest,
        reply: oneshot::Sender<Result<RunResult>>,
    },
    Start {
        id: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Restart {
        id: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Stop {
        id: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Remove {
        id: String,
        reply: oneshot::Sender<Result<()>>,
    },
    RemoveAll {
        reply: oneshot::Sender<()>,
    },
    Resize {
        id: String,
        cols: u16,
        reply: oneshot::Sender<Result<()>>,
    },
    ListRecent {
        reply: oneshot::Sender<Vec<SerializedCommand>>,
    },
    Get {
        id: String,
        reply: oneshot::Sender<Option<SerializedCommand>>,
    },
}
