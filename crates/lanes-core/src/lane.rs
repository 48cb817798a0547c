//! Lane state machine and transition validation.
//!
//! A work package is always in exactly one of seven lanes. The transition
//! table below is fixed and hardcoded; anything outside it is rejected
//! unless the caller records the transition with `force=true`, in which case
//! the bypass is accepted but counted in the snapshot for audit.
//!
//! Every ingress point (CLI text, JSON deserialization) routes through
//! [`ensure_lane`], which trims whitespace, folds case, and resolves the
//! legacy `doing` alias to `in_progress`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The seven work-package lanes.
///
/// Variant order follows the nominal lifecycle; `Blocked` and `Canceled`
/// are reachable from any other lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lane {
    Planned,
    Claimed,
    InProgress,
    ForReview,
    Done,
    Blocked,
    Canceled,
}

/// Error returned when a raw string does not name a known lane.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "invalid lane '{raw}': expected one of planned, claimed, in_progress, \
     for_review, done, blocked, canceled"
)]
pub struct InvalidLane {
    /// The rejected input, as received (before normalization).
    pub raw: String,
}

/// Error returned when a transition is not in the legality table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal lane transition {from} -> {to}: not in the transition table (set force to record it anyway)")]
pub struct IllegalTransition {
    pub from: Lane,
    pub to: Lane,
}

impl Lane {
    /// All lanes in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Planned,
        Self::Claimed,
        Self::InProgress,
        Self::ForReview,
        Self::Done,
        Self::Blocked,
        Self::Canceled,
    ];

    /// Return the canonical snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Claimed => "claimed",
            Self::InProgress => "in_progress",
            Self::ForReview => "for_review",
            Self::Done => "done",
            Self::Blocked => "blocked",
            Self::Canceled => "canceled",
        }
    }

    /// Validate a transition from `self` to `target`.
    ///
    /// Legal transitions:
    /// - `planned -> claimed`
    /// - `claimed -> in_progress`
    /// - `in_progress -> for_review`
    /// - `for_review -> done`
    /// - `for_review -> planned` (review feedback loop)
    /// - `blocked -> in_progress`
    /// - any lane `-> blocked` / `-> canceled` (except from itself)
    ///
    /// # Errors
    ///
    /// Returns [`IllegalTransition`] for any `(from, to)` pair not listed,
    /// including same-lane no-ops.
    pub fn can_transition_to(self, target: Self) -> Result<(), IllegalTransition> {
        if is_legal(self, target) {
            Ok(())
        } else {
            Err(IllegalTransition {
                from: self,
                to: target,
            })
        }
    }
}

/// Whether `(from, to)` is in the hardcoded transition table.
#[must_use]
pub fn is_legal(from: Lane, to: Lane) -> bool {
    if from == to {
        return false;
    }
    // Interruptions first: any lane can be parked or abandoned.
    if to == Lane::Blocked || to == Lane::Canceled {
        return true;
    }
    matches!(
        (from, to),
        (Lane::Planned, Lane::Claimed)
            | (Lane::Claimed, Lane::InProgress)
            | (Lane::InProgress, Lane::ForReview)
            | (Lane::ForReview, Lane::Done)
            | (Lane::ForReview, Lane::Planned)
            | (Lane::Blocked, Lane::InProgress)
    )
}

/// Normalize a raw lane string and resolve it to a [`Lane`].
///
/// Trims surrounding whitespace, folds to lowercase, and accepts the legacy
/// `doing` alias for `in_progress`.
///
/// # Errors
///
/// Returns [`InvalidLane`] naming the rejected input.
pub fn ensure_lane(raw: &str) -> Result<Lane, InvalidLane> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "planned" => Ok(Lane::Planned),
        "claimed" => Ok(Lane::Claimed),
        // `doing` is the pre-migration name for in_progress.
        "in_progress" | "doing" => Ok(Lane::InProgress),
        "for_review" => Ok(Lane::ForReview),
        "done" => Ok(Lane::Done),
        "blocked" => Ok(Lane::Blocked),
        "canceled" => Ok(Lane::Canceled),
        _ => Err(InvalidLane {
            raw: raw.to_string(),
        }),
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lane {
    type Err = InvalidLane;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ensure_lane(s)
    }
}

// Custom serde: the canonical string out, the normalizing parser in, so
// logs written with the legacy alias still deserialize.
impl Serialize for Lane {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Lane {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ensure_lane(&s).map_err(serde::de::Error::custom)
    }
}
