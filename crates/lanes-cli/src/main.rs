#![forbid(unsafe_code)]

mod actor;
mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "lanes: event-sourced work-package status",
    long_about = None
)]
struct Cli {
    /// Feature directory holding the status log.
    #[arg(long, global = true, default_value = ".")]
    feature_dir: PathBuf,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Override actor identity (skips env resolution).
    #[arg(long, global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }

    /// Get the actor flag as an Option<&str> for resolution.
    fn actor_flag(&self) -> Option<&str> {
        self.actor.as_deref()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Lifecycle",
        about = "Record a lane transition",
        long_about = "Record a lane transition for one work package by appending a status event.",
        after_help = "EXAMPLES:\n    # Claim a work package\n    lanes move WP-01 claimed\n\n    # Record an out-of-table transition (audited)\n    lanes move WP-01 planned --force\n\n    # Close out with evidence\n    lanes move WP-01 done --evidence-file review.json\n\n    # Emit machine-readable output\n    lanes move WP-01 claimed --json"
    )]
    Move(cmd::move_cmd::MoveArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show the materialized status snapshot",
        long_about = "Materialize the full event log into a snapshot of every work package's lane.",
        after_help = "EXAMPLES:\n    # Show current lanes\n    lanes status\n\n    # Persist the snapshot cache as well\n    lanes status --write-cache\n\n    # Emit machine-readable output\n    lanes status --json"
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        next_help_heading = "Read",
        about = "List the event log",
        long_about = "List every event in the feature's status log, oldest first.",
        after_help = "EXAMPLES:\n    # List typed events\n    lanes events\n\n    # Include producer-specific extension fields\n    lanes events --raw\n\n    # Emit machine-readable output\n    lanes events --json"
    )]
    Events(cmd::events::EventsArgs),

    #[command(
        next_help_heading = "Compatibility",
        about = "Project the snapshot onto legacy views",
        long_about = "Mirror the snapshot's per-WP lanes into legacy markdown frontmatter at the configured rollout phase.",
        after_help = "EXAMPLES:\n    # Project at the phase from status.toml\n    lanes sync-views\n\n    # Override the phase\n    lanes sync-views --phase 1"
    )]
    SyncViews(cmd::sync_views::SyncViewsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LANES_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "lanes=debug,info"
        } else {
            "lanes=info,warn"
        })
    });

    let format = env::var("LANES_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let repo_root = std::env::current_dir()?;
    let output = cli.output_mode();

    match cli.command {
        Commands::Move(ref args) => {
            cmd::move_cmd::run_move(args, cli.actor_flag(), output, &cli.feature_dir)
        }
        Commands::Status(ref args) => {
            cmd::status::run_status(args, output, &cli.feature_dir, &repo_root)
        }
        Commands::Events(ref args) => cmd::events::run_events(args, output, &cli.feature_dir),
        Commands::SyncViews(ref args) => {
            cmd::sync_views::run_sync_views(args, output, &cli.feature_dir, &repo_root)
        }
    }
}
