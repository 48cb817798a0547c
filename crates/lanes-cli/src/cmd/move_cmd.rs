//! `lanes move` — record a lane transition for one work package.

use crate::actor;
use crate::output::{CliError, OutputMode, render, render_error};
use anyhow::Context;
use chrono::Local;
use clap::Args;
use lanes_core::clock;
use lanes_core::config::load_feature_config;
use lanes_core::error::ErrorCode;
use lanes_core::event::{EventId, Evidence, StatusEvent};
use lanes_core::lane::Lane;
use lanes_core::reduce::materialize;
use lanes_core::store::append_event;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Work package to transition.
    pub wp_id: String,

    /// Target lane (canonical name; the legacy `doing` alias is accepted).
    pub to_lane: String,

    /// Record the transition even if it is not in the legality table.
    /// Forced transitions are counted per WP for audit.
    #[arg(long)]
    pub force: bool,

    /// JSON file holding the done-evidence payload (review approval,
    /// change records, verification results). Only valid with `done`.
    #[arg(long, value_name = "FILE")]
    pub evidence_file: Option<std::path::PathBuf>,

    /// How this actor is running (recorded on the event).
    #[arg(long, default_value = "cli")]
    pub execution_mode: String,
}

/// Load and parse the evidence payload, if one was supplied.
fn load_evidence(args: &MoveArgs, to_lane: Lane) -> anyhow::Result<Option<Evidence>> {
    let Some(path) = &args.evidence_file else {
        return Ok(None);
    };
    anyhow::ensure!(
        to_lane == Lane::Done,
        "--evidence-file only applies to transitions into done (got {to_lane})"
    );
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let evidence: Evidence = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {} as evidence", path.display()))?;
    Ok(Some(evidence))
}

pub fn run_move(
    args: &MoveArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    feature_dir: &Path,
) -> anyhow::Result<()> {
    let actor = match actor::require_actor(actor_flag) {
        Ok(a) => a,
        Err(e) => {
            render_error(output, &CliError::new(&e.message))?;
            anyhow::bail!("{}", e.message);
        }
    };

    let to_lane = match lanes_core::ensure_lane(&args.to_lane) {
        Ok(lane) => lane,
        Err(e) => {
            render_error(output, &CliError::with_code(e.to_string(), ErrorCode::InvalidLane))?;
            anyhow::bail!("{e}");
        }
    };

    let evidence = load_evidence(args, to_lane)?;

    // The WP's current lane comes from the materialized snapshot; a WP with
    // no events yet starts in planned.
    let snapshot = match materialize(feature_dir) {
        Ok(s) => s,
        Err(e) => {
            render_error(output, &CliError::from(&e))?;
            return Err(e.into());
        }
    };
    let from_lane = snapshot
        .work_packages
        .get(&args.wp_id)
        .map_or(Lane::Planned, |wp| wp.lane);

    // Validate before ticking the clock so a rejected move leaves no trace.
    if !args.force {
        if let Err(e) = from_lane.can_transition_to(to_lane) {
            render_error(
                output,
                &CliError::with_code(e.to_string(), ErrorCode::IllegalTransition),
            )?;
            anyhow::bail!("{e}");
        }
    }

    let feature_slug = if snapshot.feature_slug.is_empty() {
        feature_dir
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "feature".to_string())
    } else {
        snapshot.feature_slug
    };

    let config = load_feature_config(feature_dir)?;
    let seq = clock::tick_with_timeout(
        &clock::clock_path(feature_dir),
        &actor,
        Duration::from_millis(config.clock.lock_timeout_ms),
    )?;

    let mut extra = BTreeMap::new();
    extra.insert("clock_node".to_string(), json!(actor));
    extra.insert("clock_seq".to_string(), json!(seq));

    let event = StatusEvent {
        event_id: EventId::generate(),
        feature_slug,
        wp_id: args.wp_id.clone(),
        from_lane,
        to_lane,
        at: Local::now().fixed_offset(),
        actor,
        force: args.force,
        execution_mode: args.execution_mode.clone(),
        evidence,
        extra,
    };

    if let Err(e) = append_event(feature_dir, &event) {
        render_error(output, &CliError::from(&e))?;
        return Err(e.into());
    }
    if event.force {
        tracing::warn!(
            wp_id = %event.wp_id,
            from = %event.from_lane,
            to = %event.to_lane,
            "recorded forced transition"
        );
    }

    let val = json!({
        "ok": true,
        "wp_id": event.wp_id,
        "from_lane": event.from_lane,
        "to_lane": event.to_lane,
        "event_id": event.event_id,
        "force": event.force,
    });
    render(output, &val, |v, w| {
        let wp = v["wp_id"].as_str().unwrap_or("");
        let from = v["from_lane"].as_str().unwrap_or("");
        let to = v["to_lane"].as_str().unwrap_or("");
        let forced = if v["force"].as_bool().unwrap_or(false) {
            " (forced)"
        } else {
            ""
        };
        writeln!(w, "✓ {wp}: {from} -> {to}{forced}")
    })?;

    Ok(())
}
