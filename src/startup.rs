//! Consolidated session-startup report.
//!
//! Runs the startup checks strictly in sequence (current time, task status,
//! calendar classification, audit triggers, session timer) and assembles one
//! report from independently-fallible sections. Calendar trouble degrades its
//! section; a corrupt task store fails the whole report, because missing task
//! data cannot be presented as "no tasks". The session timer is only started
//! when no session exists yet; an already-running session is left untouched.

use chrono::{DateTime, Datelike};
use chrono_tz::Tz;
use serde::Serialize;

use crate::calendar::{self, CalendarScope};
use crate::clock::{weekday_display, Clock};
use crate::config::Config;
use crate::error::Error;
use crate::events::{self, ClassifiedEvent};
use crate::store::{StatusReport, TaskStore};
use crate::timer::{AuditCheck, StateDir, TimerCheck};

/// Options for one startup run.
#[derive(Debug, Clone, Copy)]
pub struct StartupOptions {
    pub scope: CalendarScope,
    /// Explicit offline mode: the calendar step is skipped, not failed.
    pub skip_calendar: bool,
}

/// The current-time block heading the report.
#[derive(Debug, Serialize)]
pub struct DatetimeBlock {
    pub iso: String,
    pub date: String,
    pub time: String,
    pub day_of_week: &'static str,
}

impl DatetimeBlock {
    fn from_now(now: DateTime<Tz>) -> Self {
        DatetimeBlock {
            iso: now.to_rfc3339(),
            date: now.format("%A, %B %-d, %Y").to_string(),
            time: now.format("%-I:%M %p").to_string().to_lowercase(),
            day_of_week: weekday_display(now.weekday()),
        }
    }
}

/// Calendar section: events, an explicit skip, or a visible degradation.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalendarSection {
    Skipped,
    Unavailable { reason: String },
    Ok { events: Vec<ClassifiedEvent> },
}

/// A section that may fail without taking the rest of the report with it.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T: Serialize> {
    Ok {
        #[serde(flatten)]
        data: T,
    },
    Failed {
        reason: String,
    },
}

impl<T: Serialize> Section<T> {
    fn from_result(result: Result<T, Error>) -> Self {
        match result {
            Ok(data) => Section::Ok { data },
            Err(e) => Section::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// Session-timer section of the report.
#[derive(Debug, Serialize)]
pub struct TimerSection {
    /// Whether this startup created the session.
    pub started: bool,
    pub check: TimerCheck,
}

/// The aggregate startup report.
#[derive(Debug, Serialize)]
pub struct StartupReport {
    pub datetime: DatetimeBlock,
    pub calendar: CalendarSection,
    pub tasks: StatusReport,
    pub audit: Section<AuditCheck>,
    pub timer: Section<TimerSection>,
}

impl StartupReport {
    /// True when any section failed or the calendar was unavailable; callers
    /// must present such a report as partial, never as complete.
    pub fn is_partial(&self) -> bool {
        matches!(self.calendar, CalendarSection::Unavailable { .. })
            || matches!(self.audit, Section::Failed { .. })
            || matches!(self.timer, Section::Failed { .. })
    }
}

/// Run the startup sequence. The only fatal path is the task store: its
/// absence or corruption fails the report as a whole.
pub fn run(clock: &Clock, config: &Config, options: StartupOptions) -> Result<StartupReport, Error> {
    let now = clock.now();
    let today = now.date_naive();

    let tasks = TaskStore::load(&config.tasks_path)?.status(today);

    let calendar = if options.skip_calendar {
        CalendarSection::Skipped
    } else {
        match calendar::fetch_events(config.calendar_cmd.as_deref(), options.scope) {
            Ok(raw) => CalendarSection::Ok {
                events: events::classify_all(raw, now.fixed_offset()),
            },
            Err(e) => CalendarSection::Unavailable {
                reason: e.to_string(),
            },
        }
    };

    let state = StateDir::new(&config.state_dir);
    let audit = Section::from_result(state.audit_check(today));

    let timer = Section::from_result(start_if_uninitialized(&state, now.fixed_offset()));

    Ok(StartupReport {
        datetime: DatetimeBlock::from_now(now),
        calendar,
        tasks,
        audit,
        timer,
    })
}

fn start_if_uninitialized(
    state: &StateDir,
    now: chrono::DateTime<chrono::FixedOffset>,
) -> Result<TimerSection, Error> {
    let started = state.load_session()?.is_none();
    if started {
        state.start(now)?;
    }
    Ok(TimerSection {
        started,
        check: state.check(now)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        Config {
            timezone: "America/New_York".into(),
            tasks_path: dir.path().join("tasks.csv"),
            state_dir: dir.path().to_path_buf(),
            calendar_cmd: None,
        }
    }

    fn options() -> StartupOptions {
        StartupOptions {
            scope: CalendarScope::Today,
            skip_calendar: true,
        }
    }

    #[test]
    fn corrupt_store_fails_the_whole_report() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        fs::write(&config.tasks_path, "name,due_date\nBad Task,not-a-date\n").unwrap();
        let clock = Clock::new(&config.timezone).unwrap();
        assert!(matches!(
            run(&clock, &config, options()),
            Err(Error::StoreCorrupt { .. })
        ));
    }

    #[test]
    fn missing_store_fails_the_whole_report() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let clock = Clock::new(&config.timezone).unwrap();
        assert!(matches!(
            run(&clock, &config, options()),
            Err(Error::StoreUnreadable { .. })
        ));
    }

    #[test]
    fn skip_flag_marks_calendar_skipped_not_failed() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        fs::write(&config.tasks_path, "name,due_date\nChore,2026-02-10\n").unwrap();
        let clock = Clock::new(&config.timezone).unwrap();
        let report = run(&clock, &config, options()).unwrap();
        assert!(matches!(report.calendar, CalendarSection::Skipped));
        // A skipped calendar is not a degradation.
        assert!(!report.is_partial());
    }

    #[test]
    fn unconfigured_calendar_degrades_but_report_survives() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        fs::write(&config.tasks_path, "name,due_date\nChore,2026-02-10\n").unwrap();
        let clock = Clock::new(&config.timezone).unwrap();
        let report = run(
            &clock,
            &config,
            StartupOptions {
                scope: CalendarScope::Today,
                skip_calendar: false,
            },
        )
        .unwrap();
        assert!(matches!(
            report.calendar,
            CalendarSection::Unavailable { .. }
        ));
        assert!(report.is_partial());
    }

    #[test]
    fn first_startup_starts_the_timer_second_leaves_it() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        fs::write(&config.tasks_path, "name,due_date\nChore,2026-02-10\n").unwrap();
        let clock = Clock::new(&config.timezone).unwrap();

        let first = run(&clock, &config, options()).unwrap();
        match first.timer {
            Section::Ok { ref data } => assert!(data.started),
            ref other => panic!("timer section failed: {other:?}"),
        }

        let second = run(&clock, &config, options()).unwrap();
        match second.timer {
            Section::Ok { ref data } => {
                assert!(!data.started);
                assert!(matches!(data.check, TimerCheck::Running { .. }));
            }
            ref other => panic!("timer section failed: {other:?}"),
        }
    }
}
