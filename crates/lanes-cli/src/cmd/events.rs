//! `lanes events` — list a feature's status log.

use crate::output::{CliError, OutputMode, render, render_error};
use clap::Args;
use lanes_core::canonical::canonical_json;
use lanes_core::store::{read_events, read_raw_events};
use std::path::Path;

#[derive(Args, Debug)]
pub struct EventsArgs {
    /// Emit raw log records (untyped JSON) instead of typed events. Shows
    /// producer-specific fields outside the canonical schema.
    #[arg(long)]
    pub raw: bool,
}

pub fn run_events(args: &EventsArgs, output: OutputMode, feature_dir: &Path) -> anyhow::Result<()> {
    if args.raw {
        let records = match read_raw_events(feature_dir) {
            Ok(r) => r,
            Err(e) => {
                render_error(output, &CliError::from(&e))?;
                return Err(e.into());
            }
        };
        return render(output, &records, |records, w| {
            for record in records {
                writeln!(w, "{}", canonical_json(record))?;
            }
            Ok(())
        });
    }

    let events = match read_events(feature_dir) {
        Ok(e) => e,
        Err(e) => {
            render_error(output, &CliError::from(&e))?;
            return Err(e.into());
        }
    };
    render(output, &events, |events, w| {
        for event in events {
            writeln!(w, "{event}")?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use lanes_core::event::{EventId, StatusEvent};
    use lanes_core::lane::Lane;
    use lanes_core::store::append_event;

    fn append_sample(dir: &Path) {
        let mut event = StatusEvent {
            event_id: EventId::parse("01HQ3KD7200000000000000001").expect("valid ulid"),
            feature_slug: "checkout-flow".into(),
            wp_id: "WP-01".into(),
            from_lane: Lane::Planned,
            to_lane: Lane::Claimed,
            at: DateTime::parse_from_rfc3339("2026-03-02T09:00:00+00:00").expect("valid ts"),
            actor: "alice".into(),
            force: false,
            execution_mode: "cli".into(),
            evidence: None,
            extra: std::collections::BTreeMap::new(),
        };
        event
            .extra
            .insert("clock_seq".into(), serde_json::json!(1));
        append_event(dir, &event).expect("append");
    }

    #[test]
    fn events_args_default_is_typed() {
        use clap::Parser;
        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: EventsArgs,
        }
        assert!(!Wrapper::parse_from(["test"]).args.raw);
        assert!(Wrapper::parse_from(["test", "--raw"]).args.raw);
    }

    #[test]
    fn run_events_on_missing_log_is_empty_not_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = EventsArgs { raw: false };
        run_events(&args, OutputMode::Human, dir.path()).expect("events");
        let args = EventsArgs { raw: true };
        run_events(&args, OutputMode::Human, dir.path()).expect("raw events");
    }

    #[test]
    fn run_events_reads_typed_and_raw() {
        let dir = tempfile::tempdir().expect("tempdir");
        append_sample(dir.path());
        run_events(&EventsArgs { raw: false }, OutputMode::Json, dir.path()).expect("typed");
        run_events(&EventsArgs { raw: true }, OutputMode::Json, dir.path()).expect("raw");
    }

    #[test]
    fn run_events_surfaces_corruption() {
        let dir = tempfile::tempdir().expect("tempdir");
        append_sample(dir.path());
        let log = lanes_core::store::log_path(dir.path());
        let mut text = std::fs::read_to_string(&log).expect("read");
        text.push_str("{bad json}\n");
        std::fs::write(&log, text).expect("write");

        let err = run_events(&EventsArgs { raw: false }, OutputMode::Human, dir.path())
            .expect_err("should fail");
        assert!(err.to_string().contains("line 2"), "got: {err}");
    }
}
