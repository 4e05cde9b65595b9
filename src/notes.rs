//! Append-only note log.
//!
//! Each note is one UTF-8 line of the form `[YYYY-MM-DD HH:MM] content`,
//! newline-terminated, with no header or index. The file is opened,
//! appended, and closed per write; no handle is held across calls.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;

/// How many notes a read-back surfaces, oldest of the window first.
pub const RECENT_NOTE_COUNT: usize = 3;

/// Timestamp layout used for the line prefix.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Appends one timestamped note line, creating the log if absent.
///
/// # Parameters
/// * `path` - Note log location.
/// * `content` - The note body, already stripped of trigger phrases.
///
/// # Returns
/// `Ok(())` once the line is written and the file is closed.
///
/// # Errors
/// Returns an error if the file cannot be opened or written.
pub fn append_note(path: &Path, content: &str) -> Result<()> {
    let timestamp = Local::now().format(TIMESTAMP_FORMAT);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    writeln!(file, "[{}] {}", timestamp, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Reads the last `count` notes in file order with timestamps stripped.
///
/// # Details
/// Never mutates the log; repeated calls return the same window absent new
/// writes. Blank lines are ignored. Lines without a `]` separator are
/// returned whole.
///
/// # Parameters
/// * `path` - Note log location.
/// * `count` - Size of the trailing window to surface.
///
/// # Returns
/// The most recent note bodies, oldest of the window first; empty when the
/// log holds no notes.
///
/// # Errors
/// Returns an error if the file exists but cannot be read.
pub fn read_recent(path: &Path, count: usize) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let lines: Vec<&str> = contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    let start = lines.len().saturating_sub(count);
    Ok(lines[start..]
        .iter()
        .map(|line| strip_timestamp(line).to_string())
        .collect())
}

/// Strips the leading `[timestamp]` prefix from a note line.
fn strip_timestamp(line: &str) -> &str {
    match line.split_once(']') {
        Some((_, rest)) => rest.trim(),
        None => line.trim(),
    }
}
