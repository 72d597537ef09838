//! Session timer and audit state, persisted across invocations.
//!
//! Two small JSON files in an injected state directory:
//! `session_state.json` tracks when the session started and when the running
//! note was last updated, enforcing the 30-minute clock check;
//! `audit_state.json` tracks when the weekly audit and monthly review were
//! last acknowledged. A missing file is the valid "uninitialized" state, not
//! an error: reads report it, writes create it. Audit timestamps are written
//! only by an explicit acknowledgment, never inferred.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::clock::weekday_display;
use crate::error::Error;

pub const SESSION_FILE: &str = "session_state.json";
pub const AUDIT_FILE: &str = "audit_state.json";

/// Minutes between note updates before the timer reports overdue.
pub const THRESHOLD_MINUTES: i64 = 30;

/// Persisted session record. Timestamps carry their UTC offset so elapsed
/// arithmetic is exact across DST transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_start: DateTime<FixedOffset>,
    pub last_update: DateTime<FixedOffset>,
    #[serde(default)]
    pub update_count: u32,
}

/// Persisted audit acknowledgments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditState {
    pub last_weekly_audit: Option<NaiveDate>,
    pub last_monthly_review: Option<NaiveDate>,
}

/// Result of a pure timer read.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TimerCheck {
    /// No session file yet; a fresh session has no timer to violate.
    Uninitialized,
    Running {
        current_time: DateTime<FixedOffset>,
        session_start: DateTime<FixedOffset>,
        minutes_since_start: i64,
        last_update: DateTime<FixedOffset>,
        minutes_since_update: i64,
        overdue: bool,
        /// Minutes left before the check becomes overdue; zero once it is.
        minutes_remaining: i64,
        update_count: u32,
        threshold_minutes: i64,
    },
}

/// Result of recording a note update.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReceipt {
    pub recorded_at: DateTime<FixedOffset>,
    /// Minutes since the previous update, absent when this update started
    /// the session.
    pub minutes_since_previous: Option<i64>,
    pub update_count: u32,
}

/// Audit triggers for the current date.
#[derive(Debug, Clone, Serialize)]
pub struct AuditCheck {
    pub today: NaiveDate,
    pub weekday: &'static str,
    pub weekly_audit_needed: bool,
    pub days_since_weekly_audit: Option<i64>,
    pub monthly_review_needed: bool,
    pub in_first_week: bool,
    pub last_monthly_review: Option<NaiveDate>,
}

/// Timer and audit state bound to one storage directory. Always constructed
/// with an explicit path so tests can supply an isolated location.
#[derive(Debug, Clone)]
pub struct StateDir {
    dir: PathBuf,
}

impl StateDir {
    pub fn new(dir: &Path) -> Self {
        StateDir { dir: dir.into() }
    }

    pub fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.dir.join(AUDIT_FILE)
    }

    /// Begin a session: both timestamps become `now` and the update counter
    /// resets. Overwrites any previous session.
    pub fn start(&self, now: DateTime<FixedOffset>) -> Result<SessionState, Error> {
        let state = SessionState {
            session_start: now,
            last_update: now,
            update_count: 0,
        };
        self.write_session(&state)?;
        Ok(state)
    }

    /// Record a note update. Advances `last_update` monotonically; starts a
    /// session implicitly if none exists.
    pub fn update(&self, now: DateTime<FixedOffset>) -> Result<UpdateReceipt, Error> {
        let receipt;
        let state = match self.load_session()? {
            Some(mut state) => {
                receipt = UpdateReceipt {
                    recorded_at: now,
                    minutes_since_previous: Some((now - state.last_update).num_minutes()),
                    update_count: state.update_count + 1,
                };
                // Never roll the clock backward, even if the wall clock did.
                if now > state.last_update {
                    state.last_update = now;
                }
                state.update_count += 1;
                state
            }
            None => {
                receipt = UpdateReceipt {
                    recorded_at: now,
                    minutes_since_previous: None,
                    update_count: 1,
                };
                SessionState {
                    session_start: now,
                    last_update: now,
                    update_count: 1,
                }
            }
        };
        self.write_session(&state)?;
        Ok(receipt)
    }

    /// Pure read of the timer. Never mutates state; calling it any number of
    /// times changes nothing.
    pub fn check(&self, now: DateTime<FixedOffset>) -> Result<TimerCheck, Error> {
        let Some(state) = self.load_session()? else {
            return Ok(TimerCheck::Uninitialized);
        };
        let minutes_since_update = (now - state.last_update).num_minutes();
        Ok(TimerCheck::Running {
            current_time: now,
            session_start: state.session_start,
            minutes_since_start: (now - state.session_start).num_minutes(),
            last_update: state.last_update,
            minutes_since_update,
            overdue: minutes_since_update >= THRESHOLD_MINUTES,
            minutes_remaining: (THRESHOLD_MINUTES - minutes_since_update).max(0),
            update_count: state.update_count,
            threshold_minutes: THRESHOLD_MINUTES,
        })
    }

    /// Pure read of the audit triggers: the weekly audit is due unless one
    /// was acknowledged in the current ISO week; the monthly review is due in
    /// the first seven days of a month with no acknowledgment that month.
    pub fn audit_check(&self, today: NaiveDate) -> Result<AuditCheck, Error> {
        let audit = self.load_audit()?.unwrap_or_default();

        let weekly_audit_needed = audit
            .last_weekly_audit
            .map_or(true, |last| last.iso_week() != today.iso_week());
        let days_since_weekly_audit =
            audit.last_weekly_audit.map(|last| (today - last).num_days());

        let in_first_week = today.day() <= 7;
        let monthly_review_needed = in_first_week
            && audit
                .last_monthly_review
                .map_or(true, |last| (last.year(), last.month()) != (today.year(), today.month()));

        Ok(AuditCheck {
            today,
            weekday: weekday_display(today.weekday()),
            weekly_audit_needed,
            days_since_weekly_audit,
            monthly_review_needed,
            in_first_week,
            last_monthly_review: audit.last_monthly_review,
        })
    }

    /// Acknowledge the weekly audit, and optionally the monthly review.
    pub fn audit_done(&self, today: NaiveDate, monthly: bool) -> Result<AuditState, Error> {
        let mut audit = self.load_audit()?.unwrap_or_default();
        audit.last_weekly_audit = Some(today);
        if monthly {
            audit.last_monthly_review = Some(today);
        }
        self.write_audit(&audit)?;
        Ok(audit)
    }

    pub fn load_session(&self) -> Result<Option<SessionState>, Error> {
        read_json(&self.session_path())
    }

    pub fn load_audit(&self) -> Result<Option<AuditState>, Error> {
        read_json(&self.audit_path())
    }

    fn write_session(&self, state: &SessionState) -> Result<(), Error> {
        write_json(&self.session_path(), state)
    }

    fn write_audit(&self, audit: &AuditState) -> Result<(), Error> {
        write_json(&self.audit_path(), audit)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, Error> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value = serde_json::from_str(&content).map_err(|source| Error::State {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(value))
}

/// Atomic write (temp file + rename), matching the task store's guarantee.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    let mut f = File::create(&tmp)?;
    let data = serde_json::to_string_pretty(value).map_err(|source| Error::State {
        path: path.display().to_string(),
        source,
    })?;
    f.write_all(data.as_bytes())?;
    f.flush()?;
    fs::rename(tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn at(hms: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("2026-02-10T{hms}-05:00")).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn check_on_missing_file_reports_uninitialized() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());
        assert!(matches!(
            state.check(at("09:00:00")).unwrap(),
            TimerCheck::Uninitialized
        ));
    }

    #[test]
    fn thirty_minute_threshold() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());
        state.start(at("09:00:00")).unwrap();

        match state.check(at("09:25:00")).unwrap() {
            TimerCheck::Running {
                overdue,
                minutes_since_update,
                ..
            } => {
                assert!(!overdue);
                assert_eq!(minutes_since_update, 25);
            }
            other => panic!("expected running timer, got {other:?}"),
        }
        match state.check(at("09:31:00")).unwrap() {
            TimerCheck::Running { overdue, .. } => assert!(overdue),
            other => panic!("expected running timer, got {other:?}"),
        }
    }

    #[test]
    fn check_is_a_pure_read() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());
        state.start(at("09:00:00")).unwrap();
        let before = fs::read_to_string(state.session_path()).unwrap();
        for _ in 0..5 {
            state.check(at("09:10:00")).unwrap();
        }
        let after = fs::read_to_string(state.session_path()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn update_advances_and_counts() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());
        state.start(at("09:00:00")).unwrap();

        let receipt = state.update(at("09:20:00")).unwrap();
        assert_eq!(receipt.minutes_since_previous, Some(20));
        assert_eq!(receipt.update_count, 1);

        match state.check(at("09:45:00")).unwrap() {
            TimerCheck::Running {
                minutes_since_update,
                minutes_since_start,
                overdue,
                ..
            } => {
                assert_eq!(minutes_since_update, 25);
                assert_eq!(minutes_since_start, 45);
                assert!(!overdue);
            }
            other => panic!("expected running timer, got {other:?}"),
        }
    }

    #[test]
    fn update_never_rolls_backward() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());
        state.start(at("09:30:00")).unwrap();
        state.update(at("09:00:00")).unwrap();
        let session = state.load_session().unwrap().unwrap();
        assert_eq!(session.last_update, at("09:30:00"));
    }

    #[test]
    fn update_on_missing_file_starts_a_session() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());
        let receipt = state.update(at("09:05:00")).unwrap();
        assert_eq!(receipt.minutes_since_previous, None);
        let session = state.load_session().unwrap().unwrap();
        assert_eq!(session.session_start, at("09:05:00"));
    }

    #[test]
    fn weekly_audit_keyed_to_iso_week() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());

        // Never audited: due.
        assert!(state.audit_check(d(2026, 2, 10)).unwrap().weekly_audit_needed);

        // 2026-02-09 (Mon) and 2026-02-10 (Tue) share an ISO week.
        state.audit_done(d(2026, 2, 9), false).unwrap();
        assert!(!state.audit_check(d(2026, 2, 10)).unwrap().weekly_audit_needed);

        // The following Monday is a new ISO week.
        assert!(state.audit_check(d(2026, 2, 16)).unwrap().weekly_audit_needed);
    }

    #[test]
    fn monthly_review_due_only_in_first_week() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());

        let check = state.audit_check(d(2026, 2, 3)).unwrap();
        assert!(check.in_first_week);
        assert!(check.monthly_review_needed);

        // Outside the first seven days it is never due.
        let check = state.audit_check(d(2026, 2, 15)).unwrap();
        assert!(!check.in_first_week);
        assert!(!check.monthly_review_needed);

        // Acknowledged this month: no longer due.
        state.audit_done(d(2026, 2, 3), true).unwrap();
        assert!(!state.audit_check(d(2026, 2, 5)).unwrap().monthly_review_needed);

        // New month, first week, last review was February: due again.
        assert!(state.audit_check(d(2026, 3, 2)).unwrap().monthly_review_needed);
    }

    #[test]
    fn audit_done_without_monthly_leaves_review_untouched() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());
        state.audit_done(d(2026, 2, 3), true).unwrap();
        state.audit_done(d(2026, 2, 10), false).unwrap();
        let audit = state.load_audit().unwrap().unwrap();
        assert_eq!(audit.last_weekly_audit, Some(d(2026, 2, 10)));
        assert_eq!(audit.last_monthly_review, Some(d(2026, 2, 3)));
    }
}
