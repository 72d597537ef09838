//! Interface to the external calendar collaborator.
//!
//! Events come from a user-configured query command (`DAYKEEPER_CALENDAR_CMD`)
//! invoked with the requested scope as its final argument. The command must
//! print a JSON array of `{"title", "start", "end"}` objects with RFC 3339
//! timestamps. The round-trip is bounded by a timeout. Any failure (no
//! command configured, spawn error, timeout, non-zero exit, unusable output)
//! surfaces as `CalendarUnavailable` so callers degrade instead of mistaking
//! it for an empty calendar.

use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use chrono::DateTime;
use clap::ValueEnum;
use serde::Deserialize;

use crate::error::Error;
use crate::events::CalendarEvent;

/// Wall-clock bound on the external calendar query.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(15);

/// Date range requested from the calendar collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CalendarScope {
    Today,
    #[value(name = "today+tomorrow")]
    TodayTomorrow,
    Week,
}

impl CalendarScope {
    /// The scope argument passed to the query command.
    pub fn as_arg(self) -> &'static str {
        match self {
            CalendarScope::Today => "today",
            CalendarScope::TodayTomorrow => "today+tomorrow",
            CalendarScope::Week => "week",
        }
    }
}

#[derive(Deserialize)]
struct RawEvent {
    title: String,
    start: String,
    end: String,
}

/// Fetch events for `scope` via the configured command, or fail as
/// unavailable. `command` is split on whitespace: first token is the program,
/// the rest are leading arguments.
pub fn fetch_events(
    command: Option<&str>,
    scope: CalendarScope,
) -> Result<Vec<CalendarEvent>, Error> {
    let command = command.ok_or_else(|| {
        Error::CalendarUnavailable(format!(
            "no query command configured (set {})",
            crate::config::ENV_CALENDAR_CMD
        ))
    })?;

    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| Error::CalendarUnavailable("query command is empty".into()))?;

    let mut child = Command::new(program)
        .args(parts)
        .arg(scope.as_arg())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| Error::CalendarUnavailable(format!("cannot run '{program}': {e}")))?;

    // Drain stdout off-thread so a chatty child never blocks on a full pipe
    // while we wait on it.
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::CalendarUnavailable("no stdout from query command".into()))?;
    let reader = std::thread::spawn(move || {
        let mut buf = String::new();
        stdout.read_to_string(&mut buf).ok();
        buf
    });

    let deadline = Instant::now() + QUERY_TIMEOUT;
    let status = loop {
        match child.try_wait().map_err(|e| Error::CalendarUnavailable(e.to_string()))? {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                child.kill().ok();
                child.wait().ok();
                return Err(Error::CalendarUnavailable(format!(
                    "query timed out after {}s",
                    QUERY_TIMEOUT.as_secs()
                )));
            }
            None => std::thread::sleep(Duration::from_millis(50)),
        }
    };

    let output = reader.join().unwrap_or_default();
    if !status.success() {
        return Err(Error::CalendarUnavailable(format!(
            "query command exited with {status}"
        )));
    }
    parse_events(&output)
}

/// Parse the query command's JSON output into events.
pub fn parse_events(json: &str) -> Result<Vec<CalendarEvent>, Error> {
    let raw: Vec<RawEvent> = serde_json::from_str(json)
        .map_err(|e| Error::CalendarUnavailable(format!("unusable query output: {e}")))?;
    raw.into_iter()
        .map(|r| {
            let start = DateTime::parse_from_rfc3339(&r.start).map_err(|e| {
                Error::CalendarUnavailable(format!("event '{}' has bad start: {e}", r.title))
            })?;
            let end = DateTime::parse_from_rfc3339(&r.end).map_err(|e| {
                Error::CalendarUnavailable(format!("event '{}' has bad end: {e}", r.title))
            })?;
            Ok(CalendarEvent {
                title: r.title,
                start,
                end,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_output() {
        let events = parse_events(
            r#"[{"title": "Standup", "start": "2026-02-10T09:30:00-05:00", "end": "2026-02-10T09:45:00-05:00"}]"#,
        )
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Standup");
        assert_eq!(
            events[0].end - events[0].start,
            chrono::Duration::minutes(15)
        );
    }

    #[test]
    fn empty_array_is_a_valid_empty_day() {
        assert!(parse_events("[]").unwrap().is_empty());
    }

    #[test]
    fn garbage_output_is_unavailable_not_empty() {
        assert!(matches!(
            parse_events("503 Service Unavailable"),
            Err(Error::CalendarUnavailable(_))
        ));
        assert!(matches!(
            parse_events(r#"[{"title": "x", "start": "yesterday", "end": "later"}]"#),
            Err(Error::CalendarUnavailable(_))
        ));
    }

    #[test]
    fn missing_command_is_unavailable() {
        assert!(matches!(
            fetch_events(None, CalendarScope::Today),
            Err(Error::CalendarUnavailable(_))
        ));
    }
}
