//! Append-only event log store.
//!
//! One newline-delimited UTF-8 file per feature directory, one canonical
//! JSON object per line. Appends are a single `write` in open-append mode —
//! no read-modify-write — so concurrent appenders from separate processes
//! interleave whole lines and never corrupt each other. A reader racing a
//! writer at worst misses the newest line; the reducer's internal sort makes
//! physical interleaving order irrelevant.
//!
//! Reads are strict at line granularity: a line that is not valid JSON, or
//! that is missing required [`StatusEvent`] fields, aborts the read with the
//! exact 1-indexed line number so an operator can open the file and repair
//! the one bad line. Silently dropping history would be worse than the hard
//! stop. Blank lines are skipped; a missing file is valid fresh state.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::canonical::to_canonical_json;
use crate::error::ErrorCode;
use crate::event::StatusEvent;
use crate::lane::IllegalTransition;

/// File name of the event log inside a feature directory.
pub const LOG_FILE: &str = "status.jsonl";

/// Path of the event log for a feature directory.
#[must_use]
pub fn log_path(feature_dir: &Path) -> PathBuf {
    feature_dir.join(LOG_FILE)
}

/// Errors from appending to or reading a feature's event log.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The proposed transition is not in the legality table and the event
    /// was not marked `force`. Raised before anything is written.
    #[error(transparent)]
    Transition(#[from] IllegalTransition),

    /// A specific log line could not be parsed. `line` is 1-indexed.
    #[error("{}: line {line}: {details}", path.display())]
    CorruptLine {
        path: PathBuf,
        line: usize,
        details: String,
    },

    #[error("failed to serialize event: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The serialized event contained a literal newline, which would split
    /// the record across lines.
    #[error("serialized event contains a literal newline")]
    NewlineInPayload,

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Transition(_) => ErrorCode::IllegalTransition,
            Self::CorruptLine { .. } => ErrorCode::CorruptLogLine,
            Self::Serialize(_) | Self::NewlineInPayload | Self::Io { .. } => {
                ErrorCode::LogIoFailed
            }
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

/// Validate and append one event to the feature's log.
///
/// Unless the event is marked `force`, its `(from_lane, to_lane)` pair must
/// be in the transition table; validation happens before any write. Parent
/// directories are created if absent. The line is canonical JSON, so two
/// processes appending the same logical event write identical bytes.
///
/// # Errors
///
/// Returns [`StoreError::Transition`] for an unforced illegal transition,
/// or [`StoreError::Io`]/[`StoreError::Serialize`] on write failure.
pub fn append_event(feature_dir: &Path, event: &StatusEvent) -> Result<(), StoreError> {
    if !event.force {
        event.from_lane.can_transition_to(event.to_lane)?;
    }

    let mut line = to_canonical_json(event).map_err(StoreError::Serialize)?;
    if line.contains('\n') {
        return Err(StoreError::NewlineInPayload);
    }
    line.push('\n');

    let path = log_path(feature_dir);
    let io_err = |source| StoreError::Io {
        path: log_path(feature_dir),
        source,
    };

    fs::create_dir_all(feature_dir).map_err(io_err)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(io_err)?;
    file.write_all(line.as_bytes()).map_err(io_err)?;

    debug!(
        path = %path.display(),
        event_id = %event.event_id,
        wp_id = %event.wp_id,
        from = %event.from_lane,
        to = %event.to_lane,
        force = event.force,
        "appended status event"
    );
    Ok(())
}

/// Read every event in the feature's log, in file order.
///
/// A missing log file returns an empty vec — uninitialized state is valid
/// state. Blank lines are skipped.
///
/// # Errors
///
/// Returns [`StoreError::CorruptLine`] with the 1-indexed line number of
/// the first malformed line; the read aborts rather than skipping it.
pub fn read_events(feature_dir: &Path) -> Result<Vec<StatusEvent>, StoreError> {
    parse_log(feature_dir, |line| serde_json::from_str::<StatusEvent>(line))
}

/// Read every log line as an untyped JSON value, in file order.
///
/// Same corruption reporting as [`read_events`], but only JSON syntax is
/// checked — producer-specific fields outside the [`StatusEvent`] schema
/// can be inspected without a schema bump.
///
/// # Errors
///
/// Returns [`StoreError::CorruptLine`] for the first non-JSON line.
pub fn read_raw_events(feature_dir: &Path) -> Result<Vec<serde_json::Value>, StoreError> {
    parse_log(feature_dir, |line| {
        serde_json::from_str::<serde_json::Value>(line)
    })
}

fn parse_log<T>(
    feature_dir: &Path,
    parse: impl Fn(&str) -> Result<T, serde_json::Error>,
) -> Result<Vec<T>, StoreError> {
    let path = log_path(feature_dir);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(StoreError::Io {
                path,
                source: err,
            });
        }
    };

    let mut records = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse(line) {
            Ok(record) => records.push(record),
            Err(err) => {
                return Err(StoreError::CorruptLine {
                    path,
                    line: i + 1,
                    details: err.to_string(),
                });
            }
        }
    }
    Ok(records)
}
