//! Deterministic reducer from the event log to a status snapshot.
//!
//! The snapshot is a pure function of the event set: [`reduce`] sorts the
//! events internally by `(at, event_id)` before folding, so the result is
//! identical for any physical ordering of the log — concurrent appenders
//! interleave lines in whatever order the filesystem flushes them, and none
//! of that matters. The snapshot is safe to discard and recompute at any
//! time; the optional cache written by [`write_snapshot_cache`] is never a
//! second source of truth.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::canonical::to_canonical_json;
use crate::event::{EventId, Evidence, StatusEvent};
use crate::lane::Lane;
use crate::store::{self, StoreError};

/// File name of the optional snapshot cache inside a feature directory.
pub const SNAPSHOT_FILE: &str = "status.snapshot.json";

/// Current status of one work package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WpStatus {
    pub lane: Lane,
    pub actor: String,
    pub last_transition_at: DateTime<FixedOffset>,
    pub last_event_id: EventId,
    /// How many of this WP's transitions bypassed the legality table.
    /// Non-decreasing across replays of a growing log.
    pub force_count: u64,
    /// Evidence from the most recent evidence-bearing (done) transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
}

/// Materialized view of a feature's work packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub feature_slug: String,
    /// When this snapshot was computed. Informational only — never part of
    /// any correctness comparison.
    pub materialized_at: DateTime<Utc>,
    pub event_count: u64,
    pub last_event_id: Option<EventId>,
    pub work_packages: BTreeMap<String, WpStatus>,
    /// Count of WPs currently in each lane. Always carries all seven lanes
    /// (zero-filled) and is derived from `work_packages` after the fold,
    /// never mutated independently.
    pub summary: BTreeMap<Lane, u64>,
}

impl StatusSnapshot {
    /// Canonical serialization of the snapshot (keys sorted, compact).
    ///
    /// Two snapshots of the same event set are byte-identical here except
    /// for the `materialized_at` field.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        to_canonical_json(self)
    }
}

/// Fold an event set into a snapshot.
///
/// The input is re-sorted by `(at, event_id)` regardless of its order, then
/// folded left-to-right: each event overwrites its WP's lane, actor, and
/// last-transition fields; forced events increment the WP's `force_count`;
/// evidence-bearing events replace the WP's retained evidence. The lane
/// summary is recomputed from the folded map at the end.
#[must_use]
pub fn reduce(mut events: Vec<StatusEvent>) -> StatusSnapshot {
    events.sort_by(|a, b| (a.at, &a.event_id).cmp(&(b.at, &b.event_id)));

    let feature_slug = events
        .first()
        .map(|e| e.feature_slug.clone())
        .unwrap_or_default();

    let mut work_packages: BTreeMap<String, WpStatus> = BTreeMap::new();
    for event in &events {
        let force_inc = u64::from(event.force);
        work_packages
            .entry(event.wp_id.clone())
            .and_modify(|wp| {
                wp.lane = event.to_lane;
                wp.actor = event.actor.clone();
                wp.last_transition_at = event.at;
                wp.last_event_id = event.event_id.clone();
                wp.force_count += force_inc;
                if event.evidence.is_some() {
                    wp.evidence = event.evidence.clone();
                }
            })
            .or_insert_with(|| WpStatus {
                lane: event.to_lane,
                actor: event.actor.clone(),
                last_transition_at: event.at,
                last_event_id: event.event_id.clone(),
                force_count: force_inc,
                evidence: event.evidence.clone(),
            });
    }

    let summary = summarize(&work_packages);

    StatusSnapshot {
        feature_slug,
        materialized_at: Utc::now(),
        event_count: events.len() as u64,
        last_event_id: events.last().map(|e| e.event_id.clone()),
        work_packages,
        summary,
    }
}

/// Read a feature's full log and reduce it in one call.
///
/// # Errors
///
/// Propagates [`StoreError`] from the read; corruption errors carry the
/// offending line number unchanged.
pub fn materialize(feature_dir: &Path) -> Result<StatusSnapshot, StoreError> {
    Ok(reduce(store::read_events(feature_dir)?))
}

/// Persist the snapshot cache for a feature.
///
/// The cache is a convenience for dashboards and diff-based tooling only;
/// the event log stays the single source of truth.
///
/// # Errors
///
/// Returns [`StoreError`] on serialization or write failure.
pub fn write_snapshot_cache(
    feature_dir: &Path,
    snapshot: &StatusSnapshot,
) -> Result<PathBuf, StoreError> {
    let path = feature_dir.join(SNAPSHOT_FILE);
    let io_err = |source| StoreError::Io {
        path: feature_dir.join(SNAPSHOT_FILE),
        source,
    };

    let mut body = snapshot.to_canonical_json().map_err(StoreError::Serialize)?;
    body.push('\n');
    fs::create_dir_all(feature_dir).map_err(io_err)?;
    fs::write(&path, body).map_err(io_err)?;
    Ok(path)
}

/// Count current lanes across the folded map, all seven lanes present.
fn summarize(work_packages: &BTreeMap<String, WpStatus>) -> BTreeMap<Lane, u64> {
    let mut summary: BTreeMap<Lane, u64> = Lane::ALL.iter().map(|lane| (*lane, 0)).collect();
    for wp in work_packages.values() {
        if let Some(count) = summary.get_mut(&wp.lane) {
            *count += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ChangeEvidence, ReviewApproval};
    use std::collections::BTreeMap as Map;

    fn event(
        id: &str,
        wp: &str,
        from: Lane,
        to: Lane,
        at: &str,
        actor: &str,
        force: bool,
    ) -> StatusEvent {
        StatusEvent {
            event_id: EventId::parse(id).expect("valid ulid"),
            feature_slug: "checkout-flow".into(),
            wp_id: wp.into(),
            from_lane: from,
            to_lane: to,
            at: DateTime::parse_from_rfc3339(at).expect("valid ts"),
            actor: actor.into(),
            force,
            execution_mode: "worktree".into(),
            evidence: None,
            extra: Map::new(),
        }
    }

    const ID_1: &str = "01HQ3KD7200000000000000001";
    const ID_2: &str = "01HQ3KD7200000000000000002";
    const ID_3: &str = "01HQ3KD7200000000000000003";

    #[test]
    fn empty_log_reduces_to_empty_snapshot() {
        let snapshot = reduce(Vec::new());
        assert_eq!(snapshot.feature_slug, "");
        assert_eq!(snapshot.event_count, 0);
        assert!(snapshot.last_event_id.is_none());
        assert!(snapshot.work_packages.is_empty());
        assert_eq!(snapshot.summary.len(), 7);
        assert_eq!(snapshot.summary.values().sum::<u64>(), 0);
    }

    #[test]
    fn fold_tracks_latest_lane_and_actor() {
        let events = vec![
            event(ID_1, "WP-01", Lane::Planned, Lane::Claimed, "2026-03-02T09:00:00+00:00", "alice", false),
            event(ID_2, "WP-01", Lane::Claimed, Lane::InProgress, "2026-03-02T10:00:00+00:00", "bob", false),
        ];
        let snapshot = reduce(events);
        let wp = &snapshot.work_packages["WP-01"];
        assert_eq!(wp.lane, Lane::InProgress);
        assert_eq!(wp.actor, "bob");
        assert_eq!(wp.last_event_id.as_str(), ID_2);
        assert_eq!(wp.force_count, 0);
        assert_eq!(snapshot.last_event_id.as_ref().map(EventId::as_str), Some(ID_2));
        assert_eq!(snapshot.event_count, 2);
    }

    #[test]
    fn sort_is_by_timestamp_then_event_id() {
        // Same instant, different ids: the id breaks the tie.
        let events = vec![
            event(ID_2, "WP-01", Lane::Planned, Lane::Blocked, "2026-03-02T09:00:00+00:00", "b", true),
            event(ID_1, "WP-01", Lane::Planned, Lane::Claimed, "2026-03-02T09:00:00+00:00", "a", false),
        ];
        let snapshot = reduce(events);
        let wp = &snapshot.work_packages["WP-01"];
        assert_eq!(wp.lane, Lane::Blocked, "ID_2 sorts after ID_1");
        assert_eq!(snapshot.last_event_id.as_ref().map(EventId::as_str), Some(ID_2));
    }

    #[test]
    fn offsets_compare_by_instant() {
        // 10:00+02:00 is 08:00Z — earlier than 09:00Z despite the larger
        // local hour.
        let events = vec![
            event(ID_1, "WP-01", Lane::Planned, Lane::Claimed, "2026-03-02T10:00:00+02:00", "a", false),
            event(ID_2, "WP-01", Lane::Claimed, Lane::InProgress, "2026-03-02T09:00:00+00:00", "b", false),
        ];
        let snapshot = reduce(events);
        assert_eq!(snapshot.work_packages["WP-01"].lane, Lane::InProgress);
    }

    #[test]
    fn force_count_accumulates_per_wp() {
        let events = vec![
            event(ID_1, "WP-01", Lane::Planned, Lane::Claimed, "2026-03-02T09:00:00+00:00", "a", false),
            event(ID_2, "WP-01", Lane::Claimed, Lane::Done, "2026-03-02T10:00:00+00:00", "a", true),
            event(ID_3, "WP-01", Lane::Done, Lane::Claimed, "2026-03-02T11:00:00+00:00", "a", true),
        ];
        let snapshot = reduce(events);
        assert_eq!(snapshot.work_packages["WP-01"].force_count, 2);
    }

    #[test]
    fn evidence_is_retained_from_done_transition() {
        let mut done = event(ID_2, "WP-01", Lane::ForReview, Lane::Done, "2026-03-02T10:00:00+00:00", "dana", false);
        done.evidence = Some(Evidence {
            review: Some(ReviewApproval {
                reviewer: "dana".into(),
                approved: true,
                notes: None,
            }),
            changes: vec![ChangeEvidence {
                repo: "shop-api".into(),
                commit: "9f2c1ab".into(),
                branch: None,
                files_changed: Some(2),
            }],
            verifications: vec![],
        });
        let events = vec![
            event(ID_1, "WP-01", Lane::Planned, Lane::Blocked, "2026-03-02T09:00:00+00:00", "a", true),
            done,
            // Forced back out of done: evidence stays as the audit record.
            event(ID_3, "WP-01", Lane::Done, Lane::Claimed, "2026-03-02T11:00:00+00:00", "a", true),
        ];
        let snapshot = reduce(events);
        let wp = &snapshot.work_packages["WP-01"];
        assert_eq!(wp.lane, Lane::Claimed);
        let evidence = wp.evidence.as_ref().expect("evidence retained");
        assert_eq!(evidence.changes[0].commit, "9f2c1ab");
    }

    #[test]
    fn summary_is_zero_filled_and_sums_to_wp_count() {
        let events = vec![
            event(ID_1, "WP-01", Lane::Planned, Lane::Claimed, "2026-03-02T09:00:00+00:00", "a", false),
            event(ID_2, "WP-02", Lane::Planned, Lane::Blocked, "2026-03-02T10:00:00+00:00", "b", false),
        ];
        let snapshot = reduce(events);
        assert_eq!(snapshot.summary.len(), 7, "all seven lanes present");
        assert_eq!(snapshot.summary[&Lane::Claimed], 1);
        assert_eq!(snapshot.summary[&Lane::Blocked], 1);
        assert_eq!(snapshot.summary[&Lane::Planned], 0);
        assert_eq!(
            snapshot.summary.values().sum::<u64>(),
            snapshot.work_packages.len() as u64
        );
    }

    #[test]
    fn reversed_input_folds_identically() {
        let events = vec![
            event(ID_1, "WP-01", Lane::Planned, Lane::Claimed, "2026-03-02T09:00:00+00:00", "a", false),
            event(ID_2, "WP-01", Lane::Claimed, Lane::InProgress, "2026-03-02T10:00:00+00:00", "a", false),
            event(ID_3, "WP-02", Lane::Planned, Lane::Canceled, "2026-03-02T11:00:00+00:00", "b", false),
        ];
        let mut reversed = events.clone();
        reversed.reverse();

        let forward = reduce(events);
        let backward = reduce(reversed);
        assert_eq!(forward.work_packages, backward.work_packages);
        assert_eq!(forward.summary, backward.summary);
        assert_eq!(forward.event_count, backward.event_count);
        assert_eq!(forward.last_event_id, backward.last_event_id);
    }

    #[test]
    fn snapshot_serializes_with_all_lane_keys() {
        let snapshot = reduce(vec![event(
            ID_1, "WP-01", Lane::Planned, Lane::Claimed, "2026-03-02T09:00:00+00:00", "a", false,
        )]);
        let json = snapshot.to_canonical_json().expect("serialize");
        for lane in Lane::ALL {
            assert!(
                json.contains(&format!("\"{}\"", lane.as_str())),
                "summary should carry {lane}: {json}"
            );
        }
    }

    #[test]
    fn materialize_of_missing_dir_is_fresh_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshot = materialize(&dir.path().join("nope")).expect("materialize");
        assert_eq!(snapshot.event_count, 0);
        assert!(snapshot.work_packages.is_empty());
    }

    #[test]
    fn write_snapshot_cache_is_canonical_and_single_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshot = reduce(vec![event(
            ID_1, "WP-01", Lane::Planned, Lane::Claimed, "2026-03-02T09:00:00+00:00", "a", false,
        )]);
        let path = write_snapshot_cache(dir.path(), &snapshot).expect("write");
        let text = std::fs::read_to_string(path).expect("read");
        assert!(text.ends_with('\n'));
        assert_eq!(text.lines().count(), 1);
        let value: serde_json::Value =
            serde_json::from_str(text.trim_end()).expect("valid json");
        assert_eq!(value["feature_slug"], serde_json::json!("checkout-flow"));
        assert_eq!(value["event_count"], serde_json::json!(1));
    }
}
