//! Legacy compatibility bridge.
//!
//! Before the event log existed, each WP's lane lived in the YAML
//! frontmatter of a hand-edited markdown file. The bridge projects the
//! canonical snapshot back onto those files so older tooling keeps working
//! during migration. It is strictly one-way and stateless: it never reads
//! the legacy files back as input to the engine, never writes into the
//! event log, and the rollout phase is resolved by the caller and passed in.
//!
//! Projection touches only the `lane:` line of a file's frontmatter, and
//! only when the stored value differs from the canonical one — an unchanged
//! file is never rewritten, so version control sees no churn.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ErrorCode;
use crate::lane::{Lane, ensure_lane};
use crate::reduce::StatusSnapshot;

/// Rollout phase of the bridge for one feature, resolved externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatPhase {
    /// Phase 0: no-op; the legacy files remain authoritative.
    Disabled,
    /// Phase 1: mirror canonical lanes into the legacy files.
    MirrorLanes,
    /// Phase 2: same projection; consumers treat the output as
    /// generated-only and nothing reads it back.
    GeneratedOnly,
}

/// Error returned for a phase integer outside 0..=2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown compat phase {0}: expected 0, 1, or 2")]
pub struct UnknownPhase(pub u8);

impl TryFrom<u8> for CompatPhase {
    type Error = UnknownPhase;

    fn try_from(phase: u8) -> Result<Self, Self::Error> {
        match phase {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::MirrorLanes),
            2 => Ok(Self::GeneratedOnly),
            other => Err(UnknownPhase(other)),
        }
    }
}

impl CompatPhase {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Disabled => 0,
            Self::MirrorLanes => 1,
            Self::GeneratedOnly => 2,
        }
    }
}

/// Errors from writing compatibility views.
#[derive(Debug, thiserror::Error)]
pub enum CompatError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CompatError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::ViewWriteFailed,
        }
    }
}

/// Project the snapshot's per-WP lanes onto the feature's legacy files.
///
/// Each WP's view is `<feature_dir>/<wp_id>.md`; a relative `feature_dir`
/// is resolved against `repo_root`. WPs without a view file are skipped —
/// the bridge mirrors lanes into existing documents, it does not author new
/// ones. Files without parseable frontmatter are skipped with a warning.
///
/// # Errors
///
/// Returns [`CompatError::Io`] if an existing view file cannot be read or
/// rewritten.
pub fn update_all_views(
    feature_dir: &Path,
    snapshot: &StatusSnapshot,
    repo_root: &Path,
    phase: CompatPhase,
) -> Result<(), CompatError> {
    if phase == CompatPhase::Disabled {
        return Ok(());
    }

    let dir = if feature_dir.is_absolute() {
        feature_dir.to_path_buf()
    } else {
        repo_root.join(feature_dir)
    };

    for (wp_id, wp) in &snapshot.work_packages {
        let path = dir.join(format!("{wp_id}.md"));
        if !path.exists() {
            debug!(wp_id = %wp_id, path = %path.display(), "no legacy view for WP; skipping");
            continue;
        }
        let io_err = |source| CompatError::Io {
            path: path.clone(),
            source,
        };
        let text = fs::read_to_string(&path).map_err(io_err)?;
        match project_lane(&text, wp.lane) {
            Projection::Unchanged => {}
            Projection::Updated(new_text) => {
                fs::write(&path, new_text).map_err(io_err)?;
                debug!(wp_id = %wp_id, lane = %wp.lane, "mirrored lane into legacy view");
            }
            Projection::Skipped(reason) => {
                warn!(wp_id = %wp_id, path = %path.display(), reason, "legacy view not projectable");
            }
        }
    }
    Ok(())
}

enum Projection {
    /// Stored lane already matches; file untouched.
    Unchanged,
    /// Rewritten content with only the `lane:` line changed or inserted.
    Updated(String),
    Skipped(&'static str),
}

/// Rewrite the `lane:` entry of a markdown file's YAML frontmatter.
///
/// Everything outside that one line is preserved byte-for-byte; the YAML is
/// parsed only to read the current value, never re-serialized.
fn project_lane(text: &str, lane: Lane) -> Projection {
    let lines: Vec<&str> = text.lines().collect();
    if lines.first().map(|l| l.trim_end()) != Some("---") {
        return Projection::Skipped("no frontmatter");
    }
    let Some(close) = lines[1..]
        .iter()
        .position(|l| l.trim_end() == "---")
        .map(|i| i + 1)
    else {
        return Projection::Skipped("unterminated frontmatter");
    };

    let front = lines[1..close].join("\n");
    let stored: Option<Lane> = match serde_yaml::from_str::<BTreeMap<String, serde_yaml::Value>>(
        &front,
    ) {
        Ok(map) => map
            .get("lane")
            .and_then(serde_yaml::Value::as_str)
            .and_then(|raw| ensure_lane(raw).ok()),
        Err(_) => return Projection::Skipped("frontmatter is not valid YAML"),
    };

    if stored == Some(lane) {
        return Projection::Unchanged;
    }

    let mut out_lines: Vec<String> = lines.iter().map(|l| (*l).to_string()).collect();
    let lane_line = format!("lane: {lane}");
    if let Some(idx) = (1..close).find(|&i| lines[i].trim_start().starts_with("lane:")) {
        out_lines[idx] = lane_line;
    } else {
        out_lines.insert(close, lane_line);
    }

    let mut out = out_lines.join("\n");
    if text.ends_with('\n') {
        out.push('\n');
    }
    Projection::Updated(out)
}
