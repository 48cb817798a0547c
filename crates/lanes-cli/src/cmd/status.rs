//! `lanes status` — materialize the event log and show the snapshot.

use crate::output::{CliError, OutputMode, render, render_error};
use clap::Args;
use lanes_core::compat::{CompatPhase, update_all_views};
use lanes_core::config::load_feature_config;
use lanes_core::reduce::{StatusSnapshot, materialize, write_snapshot_cache};
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Persist the snapshot as status.snapshot.json (cache only; the log
    /// stays the source of truth).
    #[arg(long)]
    pub write_cache: bool,

    /// Also project the snapshot onto legacy views at the configured phase.
    #[arg(long)]
    pub sync_views: bool,
}

fn render_human(snapshot: &StatusSnapshot, w: &mut dyn Write) -> std::io::Result<()> {
    if snapshot.event_count == 0 {
        writeln!(w, "no events recorded")?;
        return Ok(());
    }

    writeln!(
        w,
        "{} — {} WPs, {} events",
        snapshot.feature_slug,
        snapshot.work_packages.len(),
        snapshot.event_count
    )?;
    for (lane, count) in &snapshot.summary {
        writeln!(w, "  {:<12} {count}", lane.as_str())?;
    }
    writeln!(w)?;

    writeln!(
        w,
        "{:<12} {:<12} {:<14} {:<27} {}",
        "WP", "LANE", "ACTOR", "LAST TRANSITION", "FORCED"
    )?;
    for (wp_id, wp) in &snapshot.work_packages {
        writeln!(
            w,
            "{wp_id:<12} {:<12} {:<14} {:<27} {}",
            wp.lane.as_str(),
            wp.actor,
            wp.last_transition_at.to_rfc3339(),
            wp.force_count
        )?;
    }
    Ok(())
}

pub fn run_status(
    args: &StatusArgs,
    output: OutputMode,
    feature_dir: &Path,
    repo_root: &Path,
) -> anyhow::Result<()> {
    let snapshot = match materialize(feature_dir) {
        Ok(s) => s,
        Err(e) => {
            render_error(output, &CliError::from(&e))?;
            return Err(e.into());
        }
    };

    if args.write_cache {
        if let Err(e) = write_snapshot_cache(feature_dir, &snapshot) {
            render_error(output, &CliError::from(&e))?;
            return Err(e.into());
        }
    }

    if args.sync_views {
        let config = load_feature_config(feature_dir)?;
        let phase = match CompatPhase::try_from(config.compat.phase) {
            Ok(p) => p,
            Err(e) => {
                render_error(output, &CliError::new(e.to_string()))?;
                anyhow::bail!("{e}");
            }
        };
        if let Err(e) = update_all_views(feature_dir, &snapshot, repo_root, phase) {
            render_error(output, &CliError::with_code(e.to_string(), e.code()))?;
            return Err(e.into());
        }
    }

    render(output, &snapshot, render_human)
}
