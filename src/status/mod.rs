// src/status/mod.rs

//! Incremental status calculators.
//!
//! A calculator turns the raw, chunked terminal output of one command into a
//! structured [`DetailedStatus`] while the command is still running:
//!
//! - [`build`] tracks bundler progress, emitted chunks and build errors.
//! - [`test`] tracks test-runner counts, assertion failures and compile errors.
//! - [`NoopStatusCalculator`] is used for commands nobody knows how to read.
//!
//! Each variant's state value exposes a pure `fold(self, chunk) -> Self`; the
//! calculators wrap it with whatever I/O the variant needs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::CommandStatus;

pub mod build;
pub mod stats;
pub mod text;

pub use build::{BuildDetailedStatus, BuildOptions, BuildStatus, BuildStatusCalculator, Chunk};
pub use stats::BuildStats;
pub use test::{TestDetailedStatus, TestError, TestStatus, TestStatusCalculator};

/// Structured status exposed to callers as `detailedStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DetailedStatus {
    Build(BuildDetailedStatus),
    Test(TestDetailedStatus),
}

/// Per-command state machine fed with output chunks in arrival order.
///
/// Implementations may fail; the registry logs and swallows every failure so
/// that output capture never stops because of a parser.
pub trait DetailedStatusCalculator: Send + fmt::Debug {
    /// Return to the baseline for this calculator's kind.
    fn reset(&mut self);

    /// Fold the next output chunk into the current state.
    fn add_out(&mut self, chunk: &str) -> anyhow::Result<()>;

    /// Inform the calculator about a command status transition.
    fn set_status(&mut self, status: CommandStatus) -> anyhow::Result<()>;

    fn detailed_status(&self) -> Option<DetailedStatus>;

    /// Independent copy with the same configuration and current state.
    fn boxed_clone(&self) -> Box<dyn DetailedStatusCalculator>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStatusCalculator;

impl DetailedStatusCalculator for NoopStatusCalculator {
    fn reset(&mut self) {}

    fn add_out(&mut self, _chunk: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn set_status(&mut self, _status: CommandStatus) -> anyhow::Result<()> {
        Ok(())
    }

    fn detailed_status(&self) -> Option<DetailedStatus> {
        None
    }

    fn boxed_clone(&self) -> Box<dyn DetailedStatusCalculator> {
        Box::new(*self)
    }
}
