// src/registry/record.rs

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::exec::ProcessHandle;
use crate::status::{DetailedStatus, DetailedStatusCalculator};
use crate::types::{CommandKind, CommandStatus};

/// Identity of one record in the registry arena.
///
/// Run ids repeat across restarts; keys never do. Callbacks wired to a
/// process carry the key of the record that spawned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(pub(crate) u64);

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lazily spawns the process for a record. Invoked on every (re)start with
/// the key of the record the process will report to.
pub type SpawnFactory =
    Arc<dyn Fn(RecordKey) -> anyhow::Result<Box<dyn ProcessHandle>> + Send + Sync>;

/// One tracked invocation.
pub struct CommandRecord {
    pub key: RecordKey,
    pub id: String,
    pub kind: CommandKind,
    pub workspace: Option<String>,
    /// Display string of the command line.
    pub command: String,
    pub status: CommandStatus,
    /// Everything the process printed. Only ever appended to.
    pub out: String,
    /// Output since the last drain by [`super::CommandRegistry::get`].
    pub out_chunk: String,
    pub(crate) calculator: Box<dyn DetailedStatusCalculator>,
    /// Present only while the process is running.
    pub(crate) handle: Option<Box<dyn ProcessHandle>>,
    pub(crate) factory: SpawnFactory,
}

impl fmt::Debug for CommandRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRecord")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("status", &self.status)
            .field("out_len", &self.out.len())
            .field("running", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

impl CommandRecord {
    pub fn detailed_status(&self) -> Option<DetailedStatus> {
        self.calculator.detailed_status()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn serialize(&self, include_detailed_status: bool) -> SerializedCommand {
        SerializedCommand {
            id: self.id.clone(),
            kind: self.kind,
            workspace: self.workspace.clone(),
            command: self.command.clone(),
            status: self.status,
            out: self.out.clone(),
            out_chunk: self.out_chunk.clone(),
            detailed_status: if include_detailed_status {
                self.calculator.detailed_status()
            } else {
                None
            },
        }
    }
}

/// Wire shape of a record as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedCommand {
    pub id: String,
    pub kind: CommandKind,
    pub workspace: Option<String>,
    pub command: String,
    pub status: CommandStatus,
    pub out: String,
    pub out_chunk: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_status: Option<DetailedStatus>,
}
