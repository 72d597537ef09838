//! Error types shared across the crate.

/// Errors surfaced by the scheduling and state-tracking subsystems.
///
/// `TimerUninitialized` is deliberately absent: a missing session file is a
/// valid state ("no session yet") and is reported through
/// [`crate::timer::TimerCheck::Uninitialized`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured timezone identifier could not be resolved. Fatal: all
    /// downstream date arithmetic depends on it.
    #[error("invalid timezone '{0}' (set LOCAL_TIMEZONE to an IANA name such as America/New_York)")]
    InvalidTimezone(String),

    /// The task file could not be read at all.
    #[error("cannot read task file {path}: {source}")]
    StoreUnreadable {
        path: String,
        source: std::io::Error,
    },

    /// The task file failed to parse. The operation that needed it must not
    /// proceed on partial data.
    #[error("task file {path} is corrupt at line {line}: {reason}")]
    StoreCorrupt {
        path: String,
        line: usize,
        reason: String,
    },

    /// No task matched the given name exactly.
    #[error("no task named '{0}'")]
    TaskNotFound(String),

    /// A task name embeds more than one nth-weekday phrase, so the effective
    /// recurrence cannot be resolved.
    #[error("task '{name}' embeds multiple nth-weekday phrases ({phrases}); cannot resolve recurrence")]
    AmbiguousRecurrence { name: String, phrases: String },

    /// The external calendar collaborator could not be reached or returned
    /// unusable output. Degrades the composite report, never fatal.
    #[error("calendar unavailable: {0}")]
    CalendarUnavailable(String),

    /// A date argument was not a valid YYYY-MM-DD calendar date.
    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    /// A weekday argument was not a recognised weekday name.
    #[error("invalid weekday '{0}' (use monday..sunday or mon..sun)")]
    InvalidWeekday(String),

    /// Date arithmetic left the representable calendar range.
    #[error("date arithmetic out of range for {0}")]
    DateOutOfRange(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A state file exists but holds unparseable JSON.
    #[error("state file {path}: {source}")]
    State {
        path: String,
        source: serde_json::Error,
    },
}
