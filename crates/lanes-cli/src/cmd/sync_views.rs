//! `lanes sync-views` — project the snapshot onto legacy markdown views.

use crate::output::{CliError, OutputMode, render, render_error};
use clap::Args;
use lanes_core::compat::{CompatPhase, update_all_views};
use lanes_core::config::load_feature_config;
use lanes_core::reduce::materialize;
use serde_json::json;
use std::path::Path;

#[derive(Args, Debug)]
pub struct SyncViewsArgs {
    /// Override the rollout phase from status.toml (0 = disabled,
    /// 1 = mirror lanes, 2 = generated-only).
    #[arg(long)]
    pub phase: Option<u8>,
}

pub fn run_sync_views(
    args: &SyncViewsArgs,
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

    let config = load_feature_config(feature_dir)?;
    let raw_phase = args.phase.unwrap_or(config.compat.phase);
    let phase = match CompatPhase::try_from(raw_phase) {
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

    let val = json!({
        "ok": true,
        "phase": phase.as_u8(),
        "work_packages": snapshot.work_packages.len(),
    });
    render(output, &val, |v, w| {
        let phase = v["phase"].as_u64().unwrap_or(0);
        let count = v["work_packages"].as_u64().unwrap_or(0);
        if phase == 0 {
            writeln!(w, "✓ phase 0: legacy views left untouched")
        } else {
            writeln!(w, "✓ phase {phase}: mirrored {count} WP lanes into legacy views")
        }
    })?;

    Ok(())
}
