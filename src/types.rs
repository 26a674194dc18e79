use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of a tracked command.
///
/// `Waiting` and `InProgress` are the only live states; the other three are
/// terminal and never change again through `set_final_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandStatus {
    Waiting,
    InProgress,
    Successful,
    Failed,
    Terminated,
}

impl CommandStatus {
    /// `true` for `Successful`, `Failed` and `Terminated`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CommandStatus::Successful | CommandStatus::Failed | CommandStatus::Terminated
        )
    }

    /// Final status for a process exit code. Non-zero is a failure, not an error.
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            CommandStatus::Successful
        } else {
            CommandStatus::Failed
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandStatus::Waiting => "waiting",
            CommandStatus::InProgress => "in-progress",
            CommandStatus::Successful => "successful",
            CommandStatus::Failed => "failed",
            CommandStatus::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// What kind of invocation a command is. Only `New` changes launcher
/// behaviour (there is no workspace to label yet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Add,
    New,
    Generate,
    Npm,
    Ng,
}

impl Default for CommandKind {
    fn default() -> Self {
        CommandKind::Ng
    }
}

impl FromStr for CommandKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "add" => Ok(CommandKind::Add),
            "new" => Ok(CommandKind::New),
            "generate" => Ok(CommandKind::Generate),
            "npm" => Ok(CommandKind::Npm),
            "ng" => Ok(CommandKind::Ng),
            other => Err(format!(
                "invalid command kind: {other} (expected add, new, generate, npm or ng)"
            )),
        }
    }
}

/// When to route a command through the runtime-version selector (`nvm exec`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSelectorMode {
    /// Wrap only when the working directory carries a `.nvmrc`.
    Auto,
    Always,
    Never,
}

impl Default for VersionSelectorMode {
    fn default() -> Self {
        VersionSelectorMode::Auto
    }
}
