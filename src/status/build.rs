// src/status/build.rs

//! Detailed status for build-style commands (bundler builds and dev servers).

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fs::FileSystem;
use crate::status::stats::{self, BuildStats};
use crate::status::text::{
    self, CONNECTED_MARKER, capture_block_line, fatal_error_start, is_false, last_percentage,
};
use crate::status::{DetailedStatus, DetailedStatusCalculator};
use crate::types::CommandStatus;

const SUMMARY_MARKER: &str = "Hash:";
const DEV_MIDDLEWARE_RESTART: &str = "｢wdm｣: Compiling...";

static COMPILE_RESTART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\d])0% compiling").expect("restart pattern is valid"));
static CHUNK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"chunk \{(\w+)\}\s*([\w|.]+)[^)]*\)\s*([^\[]*)\[(\w+)").expect("chunk pattern is valid")
});
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Date: ([^\s)]+)").expect("date pattern is valid"));
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Time: ([^\s)]+)").expect("time pattern is valid"));
static SERVER_ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(Port \d+ is already in use)|(getaddrinfo ENOTFOUND .*)")
        .expect("server error pattern is valid")
});
static LISTENING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"listening on (.+?):(\d+)").expect("listening pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Pending,
    InProgress,
    Success,
    Failure,
}

/// One emitted output bundle, e.g. `chunk {main} main.js (main) 381 kB [initial]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub name: String,
    pub file: String,
    pub size: String,
    #[serde(rename = "type")]
    pub chunk_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDetailedStatus {
    pub build_status: BuildStatus,
    /// 0..=100, never decreases except on a compile restart.
    pub progress: u8,
    pub date: String,
    pub time: String,
    /// Keyed by chunk name: a repeated emission replaces the earlier entry.
    pub chunks: Vec<Chunk>,
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_port: Option<u16>,
    #[serde(default)]
    pub is_for_production: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<BuildStats>,
    /// Inside an `ERROR in` block that has not seen its closing blank line yet.
    #[serde(default, skip_serializing_if = "is_false")]
    pub capturing_errors: bool,
    /// Output after the last line break, applied once its line completes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub partial_line: String,
}

impl Default for BuildDetailedStatus {
    fn default() -> Self {
        Self {
            build_status: BuildStatus::Pending,
            progress: 0,
            date: String::new(),
            time: String::new(),
            chunks: Vec::new(),
            errors: Vec::new(),
            server_host: None,
            server_port: None,
            is_for_production: false,
            output_path: None,
            index_file: None,
            stats: None,
            capturing_errors: false,
            partial_line: String::new(),
        }
    }
}

impl BuildDetailedStatus {
    /// Fold one raw output chunk into the status.
    ///
    /// Chunks may split lines arbitrarily. A line cut by a chunk boundary is
    /// carried in [`partial_line`](Self::partial_line) until it completes, and
    /// an error block left open by one chunk keeps capturing in the next.
    pub fn fold(mut self, chunk: &str) -> Self {
        if self.build_status == BuildStatus::Pending {
            self.build_status = BuildStatus::InProgress;
        }

        for line in text::take_lines(&mut self.partial_line, chunk) {
            self.apply_line(&line);
        }

        self
    }

    /// The status with the carried partial line applied as if it were
    /// complete. Used for display and once the output has ended.
    pub fn preview(&self) -> Self {
        let mut view = self.clone();
        view.flush_partial_line();
        view
    }

    fn flush_partial_line(&mut self) {
        if self.partial_line.is_empty() {
            return;
        }
        let line = text::pending_line(&std::mem::take(&mut self.partial_line));
        self.apply_line(&line);
    }

    fn apply_line(&mut self, line: &str) {
        if COMPILE_RESTART_RE.is_match(line) || line.contains(DEV_MIDDLEWARE_RESTART) {
            self.restart();
        }

        if let Some(rest) = fatal_error_start(line) {
            self.build_status = BuildStatus::Failure;
            self.progress = 100;
            self.capturing_errors = true;
            if !rest.is_empty() {
                self.errors.push(rest.to_string());
            }
            return;
        }

        if self.capturing_errors {
            self.capturing_errors = capture_block_line(&mut self.errors, line);
            return;
        }

        if let Some(p) = last_percentage(line) {
            self.progress = self.progress.max(p);
        }

        if line.contains(SUMMARY_MARKER) || line.contains(CONNECTED_MARKER) {
            self.complete();
        }

        if let Some(caps) = CHUNK_RE.captures(line) {
            self.upsert_chunk(Chunk {
                name: caps[1].to_string(),
                file: caps[2].to_string(),
                size: caps[3].trim().to_string(),
                chunk_type: caps[4].to_string(),
            });
        }

        if let Some(caps) = DATE_RE.captures(line) {
            self.date = caps[1].to_string();
        }

        if let Some(caps) = TIME_RE.captures(line) {
            self.time = format_duration(&caps[1]);
        }

        if let Some(m) = SERVER_ERROR_RE.find(line) {
            self.errors.push(m.as_str().trim().to_string());
        }

        if let Some(caps) = LISTENING_RE.captures(line) {
            if let Ok(port) = caps[2].parse::<u16>() {
                self.server_host = Some(caps[1].to_string());
                self.server_port = Some(port);
            }
        }
    }

    /// A new compilation invalidates progress and the previous run's errors.
    fn restart(&mut self) {
        self.progress = 0;
        self.build_status = BuildStatus::InProgress;
        self.errors.clear();
        self.capturing_errors = false;
    }

    fn complete(&mut self) {
        self.progress = 100;
        if self.build_status != BuildStatus::Failure {
            self.build_status = BuildStatus::Success;
        }
    }

    fn upsert_chunk(&mut self, chunk: Chunk) {
        match self.chunks.iter_mut().find(|c| c.name == chunk.name) {
            Some(existing) => *existing = chunk,
            None => self.chunks.push(chunk),
        }
    }
}

/// Render `"16477ms"` as `"16.48s"`; anything else is returned unchanged.
pub fn format_duration(raw: &str) -> String {
    if let Some(ms) = raw.strip_suffix("ms") {
        if let Ok(ms) = ms.parse::<u64>() {
            return format!("{:.2}s", ms as f64 / 1000.0);
        }
    }
    raw.to_string()
}

/// Where a build writes its output, as configured in the workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub cwd: PathBuf,
    pub output_path: Option<String>,
    pub index: Option<String>,
    pub is_for_production: bool,
}

/// Build-style calculator: the pure [`BuildDetailedStatus::fold`] plus the
/// stats side-channel read once progress first reaches 100.
#[derive(Debug, Clone)]
pub struct BuildStatusCalculator {
    options: BuildOptions,
    fs: Arc<dyn FileSystem>,
    status: BuildDetailedStatus,
}

impl BuildStatusCalculator {
    pub fn new(options: BuildOptions, fs: Arc<dyn FileSystem>) -> Self {
        let status = baseline(&options);
        Self {
            options,
            fs,
            status,
        }
    }

    pub fn status(&self) -> &BuildDetailedStatus {
        &self.status
    }

    /// Stats are read once, when progress first reaches 100.
    fn attach_stats(&self, previous_progress: u8, next: &mut BuildDetailedStatus) {
        let just_completed = next.progress == 100 && previous_progress < 100;
        if !just_completed {
            return;
        }

        let from_file = self.options.output_path.as_deref().and_then(|output| {
            let path = stats::stats_path(&self.options.cwd, output);
            match stats::read_stats_file(self.fs.as_ref(), &path) {
                Ok(s) => Some(s),
                Err(e) => {
                    debug!(path = ?path, error = %e, "stats file unavailable; using chunk sizes");
                    None
                }
            }
        });

        next.stats = Some(from_file.unwrap_or_else(|| stats::stats_from_chunks(&next.chunks)));
    }
}

fn baseline(options: &BuildOptions) -> BuildDetailedStatus {
    let join = |p: &Option<String>| {
        p.as_ref()
            .map(|p| options.cwd.join(p).to_string_lossy().into_owned())
    };
    BuildDetailedStatus {
        output_path: join(&options.output_path),
        index_file: join(&options.index),
        is_for_production: options.is_for_production,
        ..BuildDetailedStatus::default()
    }
}

impl DetailedStatusCalculator for BuildStatusCalculator {
    fn reset(&mut self) {
        self.status = baseline(&self.options);
    }

    fn add_out(&mut self, chunk: &str) -> anyhow::Result<()> {
        let mut next = self.status.clone().fold(chunk);
        self.attach_stats(self.status.progress, &mut next);
        self.status = next;
        Ok(())
    }

    fn set_status(&mut self, status: CommandStatus) -> anyhow::Result<()> {
        let failed = match status {
            CommandStatus::Waiting | CommandStatus::InProgress => return Ok(()),
            CommandStatus::Failed => true,
            CommandStatus::Successful | CommandStatus::Terminated => false,
        };

        // The output has ended: whatever is left unterminated is the last line.
        let mut last = self.status.preview();
        self.attach_stats(self.status.progress, &mut last);
        self.status = last;

        if failed {
            self.status.build_status = BuildStatus::Failure;
        } else if self.status.build_status != BuildStatus::Failure {
            self.status.build_status = BuildStatus::Success;
        }
        self.status.capturing_errors = false;
        Ok(())
    }

    fn detailed_status(&self) -> Option<DetailedStatus> {
        Some(DetailedStatus::Build(self.status.preview()))
    }

    fn boxed_clone(&self) -> Box<dyn DetailedStatusCalculator> {
        Box::new(self.clone())
    }
}
