// src/registry/mod.rs

//! Command registry.
//!
//! Owns every tracked command and two views over them:
//!
//! - `recent`: the bounded working set callers list and act on. Admission
//!   replaces a record with the same id in place, otherwise evicts the first
//!   finished record when full, otherwise rejects the run.
//! - `history`: a strict FIFO ring used for id lookups, independent of
//!   `recent` membership.
//!
//! Records live in an arena keyed by [`RecordKey`] and are dropped once
//! neither view references them. All operations are synchronous; callers that
//! share a registry across tasks serialize access through
//! [`crate::engine::CommandService`].

use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::errors::{Result, RunboardError};
use crate::status::DetailedStatusCalculator;
use crate::types::{CommandKind, CommandStatus};

mod record;

pub use record::{CommandRecord, RecordKey, SerializedCommand, SpawnFactory};

pub const DEFAULT_MAX_RECENT: usize = 5;
pub const DEFAULT_MAX_HISTORY: usize = 15;

/// Capacities of the two views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryLimits {
    pub max_recent: usize,
    pub max_history: usize,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            max_recent: DEFAULT_MAX_RECENT,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

/// Which view a lookup searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pool {
    Recent,
    History,
}

/// Arguments of [`CommandRegistry::add`].
pub struct NewCommand {
    pub kind: CommandKind,
    pub id: String,
    pub workspace: Option<String>,
    pub command: String,
    pub factory: SpawnFactory,
    pub calculator: Box<dyn DetailedStatusCalculator>,
    pub track_in_recent: bool,
}

#[derive(Debug, Clone, Copy)]
enum Admission {
    Skip,
    Replace(usize),
    Evict(usize),
    Append,
}

#[derive(Debug)]
pub struct CommandRegistry {
    limits: RegistryLimits,
    records: HashMap<RecordKey, CommandRecord>,
    recent: Vec<RecordKey>,
    history: VecDeque<RecordKey>,
    next_key: u64,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new(RegistryLimits::default())
    }
}

impl CommandRegistry {
    pub fn new(limits: RegistryLimits) -> Self {
        Self {
            limits,
            records: HashMap::new(),
            recent: Vec::with_capacity(limits.max_recent),
            history: VecDeque::with_capacity(limits.max_history),
            next_key: 0,
        }
    }

    pub fn limits(&self) -> RegistryLimits {
        self.limits
    }

    /// Register a `waiting` command.
    ///
    /// Fails with [`RunboardError::ResourceExhausted`] when the command should
    /// be tracked in `recent` but `recent` is full of live commands. Nothing
    /// is mutated in that case.
    pub fn add(&mut self, cmd: NewCommand) -> Result<RecordKey> {
        let admission = if cmd.track_in_recent {
            self.admission_for(&cmd.id)?
        } else {
            Admission::Skip
        };

        let key = RecordKey(self.next_key);
        self.next_key += 1;

        info!(command = %cmd.id, %key, kind = ?cmd.kind, "command added");

        self.records.insert(
            key,
            CommandRecord {
                key,
                id: cmd.id,
                kind: cmd.kind,
                workspace: cmd.workspace,
                command: cmd.command,
                status: CommandStatus::Waiting,
                out: String::new(),
                out_chunk: String::new(),
                calculator: cmd.calculator,
                handle: None,
                factory: cmd.factory,
            },
        );

        self.push_history(key);
        self.admit(key, admission);
        Ok(key)
    }

    /// Spawn the newest command in `history` with this id.
    pub fn start(&mut self, id: &str) -> Result<RecordKey> {
        let key = self
            .find_key(id, Pool::History)
            .ok_or_else(|| RunboardError::CommandNotFound(id.to_string()))?;
        self.start_record(key)?;
        Ok(key)
    }

    /// Spawn the process of one exact record.
    ///
    /// A failing factory leaves the record `failed` with the error appended
    /// to its output.
    pub fn start_record(&mut self, key: RecordKey) -> Result<()> {
        let Some(record) = self.records.get_mut(&key) else {
            return Err(RunboardError::CommandNotFound(key.to_string()));
        };

        if let Some(mut previous) = record.handle.take() {
            warn!(command = %record.id, %key, "starting a record that still had a process; killing it");
            previous.kill();
        }

        let factory = Arc::clone(&record.factory);
        match factory(key) {
            Ok(handle) => {
                record.handle = Some(handle);
                record.status = CommandStatus::InProgress;
                info!(command = %record.id, %key, "command started");
                Ok(())
            }
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(command = %record.id, %key, error = %reason, "failed to spawn command");

                let line = format!("{reason}\n");
                record.out.push_str(&line);
                record.out_chunk.push_str(&line);
                record.status = CommandStatus::Failed;
                isolate(&record.id, "set_status", || {
                    record.calculator.set_status(CommandStatus::Failed)
                });

                Err(RunboardError::SpawnFailed {
                    id: record.id.clone(),
                    reason,
                })
            }
        }
    }

    /// Run the newest command in `recent` with this id again.
    ///
    /// A running command is stopped first. The old record keeps its output
    /// and status; the new one starts from empty buffers and a reset
    /// calculator, and takes the old one's place in `recent`.
    pub fn restart(&mut self, id: &str) -> Result<RecordKey> {
        let old_key = self
            .find_key(id, Pool::Recent)
            .ok_or_else(|| RunboardError::CommandNotFound(id.to_string()))?;

        if self.status_by_key(old_key) == Some(CommandStatus::InProgress) {
            self.stop_records(&[old_key]);
        }

        let old = self
            .records
            .get(&old_key)
            .ok_or_else(|| RunboardError::CommandNotFound(id.to_string()))?;

        let mut calculator = old.calculator.boxed_clone();
        calculator.reset();

        let cmd = NewCommand {
            kind: old.kind,
            id: old.id.clone(),
            workspace: old.workspace.clone(),
            command: old.command.clone(),
            factory: Arc::clone(&old.factory),
            calculator,
            track_in_recent: true,
        };

        debug!(command = %id, %old_key, "restarting command");
        let key = self.add(cmd)?;
        self.start_record(key)?;
        Ok(key)
    }

    /// Append output to the newest command in `history` with this id.
    pub fn add_out(&mut self, id: &str, text: &str) {
        match self.find_key(id, Pool::History) {
            Some(key) => self.record_output(key, text),
            None => debug!(command = %id, "output for unknown command dropped"),
        }
    }

    /// Append output to one exact record and feed it to its calculator.
    ///
    /// Buffers are updated before the calculator runs, and calculator
    /// failures are logged and swallowed.
    pub fn record_output(&mut self, key: RecordKey, text: &str) {
        let Some(record) = self.records.get_mut(&key) else {
            trace!(%key, "output for dropped record ignored");
            return;
        };

        record.out.push_str(text);
        record.out_chunk.push_str(text);
        trace!(command = %record.id, %key, len = text.len(), "output appended");

        isolate(&record.id, "add_out", || record.calculator.add_out(text));
    }

    /// Unconditional status transition.
    pub fn set_status(&mut self, id: &str, status: CommandStatus) {
        match self.find_key(id, Pool::History) {
            Some(key) => self.set_record_status(key, status),
            None => debug!(command = %id, %status, "status for unknown command dropped"),
        }
    }

    /// Status transition that only applies to a `waiting` or `in-progress`
    /// command. A late exit of a stopped command is a no-op.
    pub fn set_final_status(&mut self, id: &str, status: CommandStatus) {
        let Some(key) = self.find_key(id, Pool::History) else {
            debug!(command = %id, %status, "final status for unknown command dropped");
            return;
        };
        self.set_final_record_status(key, status);
    }

    /// Exit notification of the process owned by one exact record.
    pub fn record_exit(&mut self, key: RecordKey, code: i32) {
        let applied = self.set_final_record_status(key, CommandStatus::from_exit_code(code));
        if let Some(record) = self.records.get_mut(&key) {
            record.handle = None;
            if applied {
                info!(command = %record.id, %key, exit_code = code, status = %record.status, "command finished");
            }
        }
    }

    /// Stop the newest command in `recent` with this id.
    pub fn stop(&mut self, id: &str) -> Result<()> {
        let key = self
            .find_key(id, Pool::Recent)
            .ok_or_else(|| RunboardError::CommandNotFound(id.to_string()))?;
        self.stop_records(&[key]);
        Ok(())
    }

    /// Terminate every `in-progress` record among `keys`.
    ///
    /// The status flips to `terminated` immediately; the kill itself is
    /// fire-and-forget.
    pub fn stop_records(&mut self, keys: &[RecordKey]) {
        for key in keys {
            let Some(record) = self.records.get_mut(key) else {
                continue;
            };
            if record.status != CommandStatus::InProgress {
                continue;
            }

            record.status = CommandStatus::Terminated;
            isolate(&record.id, "set_status", || {
                record.calculator.set_status(CommandStatus::Terminated)
            });
            if let Some(mut handle) = record.handle.take() {
                handle.kill();
            }
            info!(command = %record.id, %key, "command stopped");
        }
    }

    /// Stop a command and drop it from `recent`. Its `history` entry stays
    /// until the ring evicts it.
    pub fn remove(&mut self, id: &str) -> Result<()> {
        let idx = self
            .recent
            .iter()
            .rposition(|k| self.records.get(k).is_some_and(|r| r.id == id))
            .ok_or_else(|| RunboardError::CommandNotFound(id.to_string()))?;

        let key = self.recent[idx];
        self.stop_records(&[key]);
        self.recent.remove(idx);
        self.collect(key);
        debug!(command = %id, "command removed from recent");
        Ok(())
    }

    pub fn remove_all(&mut self) {
        let keys = std::mem::take(&mut self.recent);
        self.stop_records(&keys);
        for key in keys {
            self.collect(key);
        }
        debug!("all commands removed from recent");
    }

    /// Newest record with this id in `pool`.
    pub fn find(&self, id: &str, pool: Pool) -> Option<&CommandRecord> {
        self.find_key(id, pool).and_then(|k| self.records.get(&k))
    }

    pub fn record(&self, key: RecordKey) -> Option<&CommandRecord> {
        self.records.get(&key)
    }

    pub fn resize(&mut self, id: &str, cols: u16) -> Result<()> {
        let key = self
            .find_key(id, Pool::History)
            .or_else(|| self.find_key(id, Pool::Recent))
            .ok_or_else(|| RunboardError::CommandNotFound(id.to_string()))?;
        if let Some(handle) = self.records.get_mut(&key).and_then(|r| r.handle.as_mut()) {
            handle.resize(cols);
        }
        Ok(())
    }

    /// Serialized `recent`, oldest first. Does not drain `outChunk`.
    pub fn list_recent(&self, include_detailed_status: bool) -> Vec<SerializedCommand> {
        self.recent
            .iter()
            .filter_map(|k| self.records.get(k))
            .map(|r| r.serialize(include_detailed_status))
            .collect()
    }

    /// Serialized newest `history` record with this id. Drains its
    /// `outChunk`, so consecutive polls see each output once.
    pub fn get(&mut self, id: &str, include_detailed_status: bool) -> Option<SerializedCommand> {
        let key = self.find_key(id, Pool::History)?;
        let record = self.records.get_mut(&key)?;
        let serialized = record.serialize(include_detailed_status);
        record.out_chunk.clear();
        Some(serialized)
    }

    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn recent_ids(&self) -> Vec<String> {
        self.recent
            .iter()
            .filter_map(|k| self.records.get(k))
            .map(|r| r.id.clone())
            .collect()
    }

    pub fn recent_keys(&self) -> Vec<RecordKey> {
        self.recent.clone()
    }

    /// Status of the newest record with this id, from `history` or else
    /// `recent`.
    pub fn status_of(&self, id: &str) -> Option<CommandStatus> {
        self.find(id, Pool::History)
            .or_else(|| self.find(id, Pool::Recent))
            .map(|r| r.status)
    }

    fn find_key(&self, id: &str, pool: Pool) -> Option<RecordKey> {
        let matches = |k: &&RecordKey| self.records.get(*k).is_some_and(|r| r.id == id);
        match pool {
            Pool::Recent => self.recent.iter().rev().find(matches).copied(),
            Pool::History => self.history.iter().rev().find(matches).copied(),
        }
    }

    fn status_by_key(&self, key: RecordKey) -> Option<CommandStatus> {
        self.records.get(&key).map(|r| r.status)
    }

    fn set_record_status(&mut self, key: RecordKey, status: CommandStatus) {
        let Some(record) = self.records.get_mut(&key) else {
            return;
        };
        record.status = status;
        isolate(&record.id, "set_status", || record.calculator.set_status(status));
    }

    fn set_final_record_status(&mut self, key: RecordKey, status: CommandStatus) -> bool {
        match self.status_by_key(key) {
            Some(current) if !current.is_terminal() => {
                self.set_record_status(key, status);
                true
            }
            Some(current) => {
                debug!(%key, %current, ignored = %status, "stale final status ignored");
                false
            }
            None => false,
        }
    }

    fn admission_for(&self, id: &str) -> Result<Admission> {
        if let Some(idx) = self
            .recent
            .iter()
            .position(|k| self.records.get(k).is_some_and(|r| r.id == id))
        {
            return Ok(Admission::Replace(idx));
        }

        if self.recent.len() < self.limits.max_recent {
            return Ok(Admission::Append);
        }

        self.recent
            .iter()
            .position(|k| self.status_by_key(*k).is_some_and(CommandStatus::is_terminal))
            .map(Admission::Evict)
            .ok_or(RunboardError::ResourceExhausted {
                capacity: self.limits.max_recent,
            })
    }

    fn admit(&mut self, key: RecordKey, admission: Admission) {
        match admission {
            Admission::Skip => {}
            Admission::Append => self.recent.push(key),
            Admission::Replace(idx) => {
                let old = std::mem::replace(&mut self.recent[idx], key);
                self.collect(old);
            }
            Admission::Evict(idx) => {
                let old = self.recent.remove(idx);
                self.recent.push(key);
                debug!(evicted = %old, "finished command evicted from recent");
                self.collect(old);
            }
        }
    }

    fn push_history(&mut self, key: RecordKey) {
        self.history.push_back(key);
        while self.history.len() > self.limits.max_history {
            if let Some(old) = self.history.pop_front() {
                self.collect(old);
            }
        }
    }

    /// Drop a record no view references any more.
    fn collect(&mut self, key: RecordKey) {
        if self.recent.contains(&key) || self.history.contains(&key) {
            return;
        }
        if let Some(record) = self.records.remove(&key) {
            trace!(command = %record.id, %key, "record dropped");
        }
    }
}

/// Run a calculator operation, logging and swallowing both errors and panics.
fn isolate<F>(id: &str, operation: &'static str, f: F)
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(command = %id, operation, error = %e, "status calculator failed");
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            warn!(command = %id, operation, panic = %message, "status calculator panicked");
        }
    }
}
