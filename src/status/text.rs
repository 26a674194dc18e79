// src/status/text.rs

//! Text helpers shared by the status folds: ANSI stripping, line splitting,
//! percentage extraction and fatal-error block detection.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Opens a fatal build error block. Every following non-blank line up to the
/// next blank line belongs to the block.
pub const FATAL_ERROR_MARKER: &str = "ERROR in";

/// Emitted by the test runner once a browser has attached.
pub const CONNECTED_MARKER: &str = "Connected on socket";

static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x1b\x{9b}][\[()#;?]*(?:[0-9]{1,4}(?:;[0-9]{0,4})*)?[0-9A-ORZcf-nqry=><]")
        .expect("ANSI escape pattern is valid")
});

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3})%").expect("percentage pattern is valid"));

/// Remove terminal colour and cursor escape sequences.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    ANSI_RE.replace_all(text, "")
}

/// Split a chunk into lines on `\n`, `\r\n` and bare `\r`.
///
/// The newline that terminates a chunk does not produce a trailing empty
/// line, so an error block left open at the end of one chunk stays open for
/// the next. An empty chunk has no lines.
fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.split('\n')
        .flat_map(|line| line.strip_suffix('\r').unwrap_or(line).split('\r'))
        .collect()
}

/// Append `chunk` to the unterminated text carried in `pending` and return
/// the lines that are now complete, ANSI-stripped.
///
/// Whatever follows the last line break stays in `pending`. A `\r` at the
/// very end is held back too, since the `\n` of a `\r\n` may arrive with
/// the next chunk.
pub fn take_lines(pending: &mut String, chunk: &str) -> Vec<String> {
    pending.push_str(chunk);
    let searchable = pending.strip_suffix('\r').unwrap_or(pending.as_str());
    let Some(end) = searchable.rfind(['\n', '\r']) else {
        return Vec::new();
    };
    let tail = pending.split_off(end + 1);
    let complete = std::mem::replace(pending, tail);
    split_lines(&complete)
        .into_iter()
        .map(|line| strip_ansi(line).into_owned())
        .collect()
}

/// The carried partial line as it would read if the output ended here.
pub fn pending_line(pending: &str) -> String {
    strip_ansi(pending.strip_suffix('\r').unwrap_or(pending)).into_owned()
}

/// Last `NN%` token on the line, capped at 100.
pub fn last_percentage(line: &str) -> Option<u8> {
    PERCENT_RE
        .captures_iter(line)
        .last()
        .and_then(|caps| caps[1].parse::<u16>().ok())
        .map(|p| p.min(100) as u8)
}

/// If `line` opens a fatal error block, the trimmed text after the marker.
pub fn fatal_error_start(line: &str) -> Option<&str> {
    line.find(FATAL_ERROR_MARKER)
        .map(|idx| line[idx + FATAL_ERROR_MARKER.len()..].trim())
}

/// Feed one line into an open error block.
///
/// Returns `false` once the block is closed by a blank line.
pub fn capture_block_line(errors: &mut Vec<String>, line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    errors.push(trimmed.to_string());
    true
}

pub(crate) fn is_false(b: &bool) -> bool {
    !*b
}
