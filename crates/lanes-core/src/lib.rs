//! lanes-core: the event-sourced work-package status engine.
//!
//! Every actor — operator, coding agent in its own worktree, automation —
//! appends lane-transition facts to a per-feature append-only log; anyone
//! can later fold the full log into one deterministic snapshot of "what
//! lane is each WP in". There is no server and no global lock: correctness
//! comes from re-sorting the events into a total order before the fold, so
//! the result is independent of how concurrent appends interleaved on disk.
//!
//! Module map:
//! - [`lane`] — the seven lanes and the transition legality table
//! - [`event`] — the immutable [`StatusEvent`] fact and its evidence payload
//! - [`canonical`] — sorted-key JSON so independent writers emit identical bytes
//! - [`store`] — append-only JSONL log with line-granular corruption reporting
//! - [`clock`] — per-writer logical counters and the `(seq, node)` tie-break
//! - [`reduce`] — the fold from events to [`StatusSnapshot`]
//! - [`compat`] — phase-gated projection onto legacy markdown views
//! - [`config`] / [`error`] / [`lock`] — ambient plumbing
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums carrying structured data; each maps
//!   to a stable machine code via [`error::ErrorCode`].
//! - **Logging**: `tracing` macros (`debug!`, `warn!`).

pub mod canonical;
pub mod clock;
pub mod compat;
pub mod config;
pub mod error;
pub mod event;
pub mod lane;
pub mod lock;
pub mod reduce;
pub mod store;

pub use clock::{ClockStamp, tick};
pub use compat::{CompatPhase, update_all_views};
pub use event::{EventId, Evidence, StatusEvent};
pub use lane::{Lane, ensure_lane, is_legal};
pub use reduce::{StatusSnapshot, WpStatus, materialize, reduce};
pub use store::{append_event, read_events, read_raw_events};
