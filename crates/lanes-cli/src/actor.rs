//! Actor identity resolution for CLI commands.
//!
//! The resolution chain: `--actor` flag > `LANES_ACTOR` env > `USER` env
//! (TTY only). Commands that record events require an actor identity;
//! read-only commands work without one.

use std::env;

/// Errors from actor resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorResolutionError {
    /// Human-readable description.
    pub message: String,
    /// Machine error code.
    pub code: &'static str,
}

impl std::fmt::Display for ActorResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActorResolutionError {}

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

/// Core resolution logic, parameterized by environment reader.
fn resolve_actor_with(cli_flag: Option<&str>, env: &dyn EnvReader) -> Option<String> {
    if let Some(actor) = cli_flag {
        if !actor.is_empty() {
            return Some(actor.to_string());
        }
    }

    if let Some(val) = env.get("LANES_ACTOR") {
        return Some(val);
    }

    // USER only counts for an interactive shell; a headless agent must
    // identify itself explicitly.
    if env.is_tty() {
        if let Some(val) = env.get("USER") {
            return Some(val);
        }
    }

    None
}

/// Resolve the actor identity following the chain:
///
/// 1. `--actor` CLI flag (passed as `cli_flag`)
/// 2. `LANES_ACTOR` environment variable
/// 3. `USER` environment variable (only if running in a TTY)
///
/// Returns `None` if no identity could be resolved.
pub fn resolve_actor(cli_flag: Option<&str>) -> Option<String> {
    resolve_actor_with(cli_flag, &RealEnv)
}

/// Resolve the actor identity, returning an error if not found.
///
/// Use this for commands that append events.
pub fn require_actor(cli_flag: Option<&str>) -> Result<String, ActorResolutionError> {
    resolve_actor(cli_flag).ok_or_else(|| ActorResolutionError {
        message: "Actor identity required for this command. \
                  Set --actor or the LANES_ACTOR environment variable."
            .to_string(),
        code: "missing_actor",
    })
}
