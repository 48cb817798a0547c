//! Event data model for the lanes status log.
//!
//! A [`StatusEvent`] is one immutable fact: "this work package moved from
//! lane A to lane B, at this time, by this actor". Events are appended once
//! and never mutated or deleted; corrections are new events.
//!
//! The struct carries the nine required log fields plus an optional
//! [`Evidence`] payload (attached only on transitions into `done`) and a
//! flattened `extra` map. The map is the extension point for
//! producer-specific metadata (e.g. the logical-clock stamp a worktree
//! agent records); the reducer ignores it.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::lane::Lane;

/// A 26-character, lexicographically time-sortable event identifier (ULID).
///
/// String ordering equals creation-time ordering, which the reducer relies
/// on as its sort tie-break.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(String);

/// Error returned when a string is not a valid ULID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid event ID '{raw}': expected a 26-character ULID")]
pub struct InvalidEventId {
    pub raw: String,
}

impl EventId {
    /// Mint a fresh identifier for the current instant.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Validate a raw string as a ULID, preserving its exact spelling.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidEventId`] if the input is not a 26-character ULID.
    pub fn parse(raw: &str) -> Result<Self, InvalidEventId> {
        if raw.len() != 26 {
            return Err(InvalidEventId {
                raw: raw.to_string(),
            });
        }
        Ulid::from_string(raw).map_err(|_| InvalidEventId {
            raw: raw.to_string(),
        })?;
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EventId {
    type Err = InvalidEventId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for EventId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Reviewer sign-off recorded when a work package reaches `done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewApproval {
    pub reviewer: String,
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Per-repository change record backing a `done` transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvidence {
    pub repo: String,
    pub commit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_changed: Option<u64>,
}

/// Result of one verification command run before closing out a WP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub command: String,
    pub exit_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// The full done-evidence payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewApproval>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<ChangeEvidence>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verifications: Vec<VerificationResult>,
}

/// One immutable lane-transition fact in a feature's status log.
///
/// Serialized as a single JSON object per log line, keys sorted (see
/// [`crate::canonical`]), so two processes serializing the same logical
/// event produce byte-identical lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Unique, time-sortable identifier. Globally unique within a
    /// feature's log.
    pub event_id: EventId,

    /// The feature whose log this event belongs to.
    pub feature_slug: String,

    /// The work package being transitioned.
    pub wp_id: String,

    /// Lane the WP was in when the transition was proposed.
    pub from_lane: Lane,

    /// Lane the WP is in after this event.
    pub to_lane: Lane,

    /// Wall-clock time of the transition, with explicit UTC offset.
    ///
    /// Preserved byte-for-byte through replay; ordering for the reducer is
    /// `(at, event_id)`.
    pub at: DateTime<FixedOffset>,

    /// Free-text identity of whoever recorded the transition.
    pub actor: String,

    /// True if the transition bypassed the legality table.
    pub force: bool,

    /// How the producing actor was running (e.g. "worktree").
    pub execution_mode: String,

    /// Done-evidence payload; only present on transitions into `done`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,

    /// Producer-specific extension fields the reducer ignores.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{} -> {}\t{}{}",
            self.at.to_rfc3339(),
            self.event_id,
            self.wp_id,
            self.from_lane,
            self.to_lane,
            self.actor,
            if self.force { "\t[forced]" } else { "" },
        )
    }
}
