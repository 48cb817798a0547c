//! Per-writer logical clock, persisted next to the event log.
//!
//! Each writer (an agent in its own worktree, an operator shell, a CI job)
//! owns an independent Lamport-style counter keyed by its node identity.
//! Counters from all writers sharing a feature live in one small JSON state
//! file, `{node_id: last_value}`. [`tick`] is the only read-modify-write in
//! the engine, so it runs under a short-held exclusive [`PathLock`] and
//! persists with a write-temp-then-rename so a crash leaves the old or the
//! new state, never a torn file.
//!
//! A missing or corrupt state file is valid fresh state: every counter
//! reads as 0 and causal ordering degrades to "this writer is new" instead
//! of blocking.
//!
//! When two uncoordinated writers must be merged into one causal order, the
//! tie-break is [`ClockStamp`]'s `(seq, node)` ordering — total, so no two
//! distinct events ever compare equal even when counters collide.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::canonical::canonical_json;
use crate::error::ErrorCode;
use crate::lock::{LockError, PathLock};

/// File name of the clock state inside a feature directory.
pub const CLOCK_FILE: &str = "status.clock.json";

/// Default timeout for the clock file lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Path of the clock state file for a feature directory.
#[must_use]
pub fn clock_path(feature_dir: &Path) -> PathBuf {
    feature_dir.join(CLOCK_FILE)
}

/// Errors from persisting clock state.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ClockError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Lock(err) => err.code(),
            Self::Io { .. } => ErrorCode::ClockStateWriteFailed,
        }
    }
}

/// A writer's position in the merged causal order.
///
/// Derived `Ord` compares `(seq, node)`, which is the deterministic total
/// tie-break for events from independent writers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClockStamp {
    pub seq: u64,
    pub node: String,
}

/// Increment and persist the counter for `node_id`, returning the new value.
///
/// Uses [`DEFAULT_LOCK_TIMEOUT`]; see [`tick_with_timeout`].
///
/// # Errors
///
/// Returns [`ClockError`] on lock contention or filesystem failure.
pub fn tick(state_path: &Path, node_id: &str) -> Result<u64, ClockError> {
    tick_with_timeout(state_path, node_id, DEFAULT_LOCK_TIMEOUT)
}

/// [`tick`] with an explicit lock timeout.
///
/// The lock covers only this load-increment-save; it is never held across
/// an event append.
///
/// # Errors
///
/// Returns [`ClockError`] on lock contention or filesystem failure.
pub fn tick_with_timeout(
    state_path: &Path,
    node_id: &str,
    timeout: Duration,
) -> Result<u64, ClockError> {
    let lock = PathLock::acquire(&lock_file_for(state_path), timeout)?;
    let mut state = load_state(state_path);
    let next = state.get(node_id).copied().unwrap_or(0) + 1;
    state.insert(node_id.to_string(), next);
    write_state(state_path, &state)?;
    lock.release();
    Ok(next)
}

/// Read the last persisted counter for `node_id`.
///
/// Missing file, unreadable file, or missing entry all read as 0.
#[must_use]
pub fn load(state_path: &Path, node_id: &str) -> u64 {
    load_state(state_path).get(node_id).copied().unwrap_or(0)
}

/// Persist an explicit counter value for `node_id`.
///
/// Other nodes' counters in the same file are untouched. Non-negativity is
/// carried by the `u64` type.
///
/// # Errors
///
/// Returns [`ClockError`] on lock contention or filesystem failure.
pub fn save(state_path: &Path, node_id: &str, value: u64) -> Result<(), ClockError> {
    let lock = PathLock::acquire(&lock_file_for(state_path), DEFAULT_LOCK_TIMEOUT)?;
    let mut state = load_state(state_path);
    state.insert(node_id.to_string(), value);
    write_state(state_path, &state)?;
    lock.release();
    Ok(())
}

fn lock_file_for(state_path: &Path) -> PathBuf {
    let mut name = state_path
        .file_name()
        .map_or_else(|| "clock".into(), std::ffi::OsStr::to_os_string);
    name.push(".lock");
    state_path.with_file_name(name)
}

/// Load the full state map, degrading to empty on any problem.
///
/// Entries whose value is not a non-negative integer are dropped — a
/// hand-edited or corrupted counter resets that one writer, nothing else.
fn load_state(state_path: &Path) -> BTreeMap<String, u64> {
    let text = match fs::read_to_string(state_path) {
        Ok(text) => text,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(path = %state_path.display(), error = %err, "clock state unreadable; starting fresh");
            }
            return BTreeMap::new();
        }
    };
    match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(&text) {
        Ok(raw) => raw
            .into_iter()
            .filter_map(|(node, value)| match value.as_u64() {
                Some(n) => Some((node, n)),
                None => {
                    warn!(path = %state_path.display(), node = %node, "dropping non-integer clock entry");
                    None
                }
            })
            .collect(),
        Err(err) => {
            warn!(path = %state_path.display(), error = %err, "clock state corrupt; starting fresh");
            BTreeMap::new()
        }
    }
}

fn write_state(state_path: &Path, state: &BTreeMap<String, u64>) -> Result<(), ClockError> {
    let io_err = |source| ClockError::Io {
        path: state_path.to_path_buf(),
        source,
    };

    if let Some(parent) = state_path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let value = serde_json::to_value(state).map_err(|err| ClockError::Io {
        path: state_path.to_path_buf(),
        source: io::Error::other(err),
    })?;
    let mut body = canonical_json(&value);
    body.push('\n');

    // Write-temp-then-rename: a crash mid-write leaves the old state intact.
    let tmp = tmp_file_for(state_path);
    fs::write(&tmp, body).map_err(io_err)?;
    fs::rename(&tmp, state_path).map_err(io_err)?;
    Ok(())
}

fn tmp_file_for(state_path: &Path) -> PathBuf {
    let mut name = state_path
        .file_name()
        .map_or_else(|| "clock".into(), std::ffi::OsStr::to_os_string);
    name.push(".tmp");
    state_path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn tick_counts_from_one() {
        let dir = tempdir().expect("tempdir");
        let path = clock_path(dir.path());
        assert_eq!(tick(&path, "node-a").expect("tick"), 1);
        assert_eq!(tick(&path, "node-a").expect("tick"), 2);
        assert_eq!(tick(&path, "node-a").expect("tick"), 3);
        assert_eq!(load(&path, "node-a"), 3);
    }

    #[test]
    fn counters_are_independent_per_node() {
        let dir = tempdir().expect("tempdir");
        let path = clock_path(dir.path());
        assert_eq!(tick(&path, "node-a").expect("tick"), 1);
        assert_eq!(tick(&path, "node-a").expect("tick"), 2);
        assert_eq!(tick(&path, "node-a").expect("tick"), 3);
        // A second identity on the same storage file starts at its own zero.
        assert_eq!(tick(&path, "node-b").expect("tick"), 1);
        assert_eq!(load(&path, "node-a"), 3);
        assert_eq!(load(&path, "node-b"), 1);
    }

    #[test]
    fn load_missing_file_is_zero() {
        let dir = tempdir().expect("tempdir");
        let path = clock_path(dir.path());
        assert_eq!(load(&path, "node-a"), 0);
    }

    #[test]
    fn corrupt_state_degrades_to_zero() {
        let dir = tempdir().expect("tempdir");
        let path = clock_path(dir.path());
        std::fs::write(&path, "{not json").expect("write");
        assert_eq!(load(&path, "node-a"), 0);
        // And ticking repairs the file.
        assert_eq!(tick(&path, "node-a").expect("tick"), 1);
        assert_eq!(load(&path, "node-a"), 1);
    }

    #[test]
    fn negative_entry_is_dropped_not_fatal() {
        let dir = tempdir().expect("tempdir");
        let path = clock_path(dir.path());
        std::fs::write(&path, r#"{"node-a":-5,"node-b":7}"#).expect("write");
        assert_eq!(load(&path, "node-a"), 0);
        assert_eq!(load(&path, "node-b"), 7);
    }

    #[test]
    fn save_sets_explicit_value() {
        let dir = tempdir().expect("tempdir");
        let path = clock_path(dir.path());
        save(&path, "node-a", 41).expect("save");
        assert_eq!(load(&path, "node-a"), 41);
        assert_eq!(tick(&path, "node-a").expect("tick"), 42);
    }

    #[test]
    fn state_file_is_canonical_json() {
        let dir = tempdir().expect("tempdir");
        let path = clock_path(dir.path());
        tick(&path, "zeta").expect("tick");
        tick(&path, "alpha").expect("tick");
        let text = std::fs::read_to_string(&path).expect("read");
        assert_eq!(text, "{\"alpha\":1,\"zeta\":1}\n");
    }

    #[test]
    fn tick_creates_missing_directories() {
        let dir = tempdir().expect("tempdir");
        let path = clock_path(&dir.path().join("features").join("checkout"));
        assert_eq!(tick(&path, "node-a").expect("tick"), 1);
        assert!(path.exists());
    }

    #[test]
    fn no_tmp_file_left_behind() {
        let dir = tempdir().expect("tempdir");
        let path = clock_path(dir.path());
        tick(&path, "node-a").expect("tick");
        assert!(!tmp_file_for(&path).exists());
    }

    #[test]
    fn stamp_order_is_total() {
        let a1 = ClockStamp {
            seq: 1,
            node: "node-a".into(),
        };
        let b1 = ClockStamp {
            seq: 1,
            node: "node-b".into(),
        };
        let a2 = ClockStamp {
            seq: 2,
            node: "node-a".into(),
        };
        // Counter first, then node identity breaks the collision.
        assert!(a1 < b1);
        assert!(b1 < a2);
        assert!(a1 < a2);
        assert_ne!(a1, b1);
    }

    #[test]
    fn stamp_sorting_is_deterministic_under_shuffle() {
        let mut stamps = vec![
            ClockStamp {
                seq: 2,
                node: "b".into(),
            },
            ClockStamp {
                seq: 1,
                node: "b".into(),
            },
            ClockStamp {
                seq: 2,
                node: "a".into(),
            },
            ClockStamp {
                seq: 1,
                node: "a".into(),
            },
        ];
        stamps.sort();
        let order: Vec<(u64, &str)> = stamps.iter().map(|s| (s.seq, s.node.as_str())).collect();
        assert_eq!(order, [(1, "a"), (1, "b"), (2, "a"), (2, "b")]);
    }
}
