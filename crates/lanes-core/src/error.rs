use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidLane,
    IllegalTransition,
    InvalidEventId,
    CorruptLogLine,
    LogIoFailed,
    LockContention,
    ClockStateWriteFailed,
    ViewWriteFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidLane => "E2001",
            Self::IllegalTransition => "E2002",
            Self::InvalidEventId => "E2003",
            Self::CorruptLogLine => "E3001",
            Self::LogIoFailed => "E5001",
            Self::LockContention => "E5002",
            Self::ClockStateWriteFailed => "E5003",
            Self::ViewWriteFailed => "E6001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidLane => "Invalid lane value",
            Self::IllegalTransition => "Illegal lane transition",
            Self::InvalidEventId => "Invalid event ID",
            Self::CorruptLogLine => "Corrupt event log line",
            Self::LogIoFailed => "Event log read/write failed",
            Self::LockContention => "Lock contention",
            Self::ClockStateWriteFailed => "Clock state write failed",
            Self::ViewWriteFailed => "Compatibility view write failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in status.toml and retry."),
            Self::InvalidLane => Some(
                "Use one of: planned, claimed, in_progress, for_review, done, blocked, canceled.",
            ),
            Self::IllegalTransition => {
                Some("Pass --force to record an out-of-table transition (audited).")
            }
            Self::InvalidEventId => Some("Event IDs are 26-character ULIDs."),
            Self::CorruptLogLine => Some(
                "Open the log at the reported line and hand-repair it; history before \
                 the bad line is intact.",
            ),
            Self::LogIoFailed => Some("Check disk space and write permissions."),
            Self::LockContention => {
                Some("Retry after the other process releases the clock lock.")
            }
            Self::ClockStateWriteFailed => {
                Some("Check permissions on the clock state file; the old counter is preserved.")
            }
            Self::ViewWriteFailed => Some("Check permissions on the legacy view files."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
