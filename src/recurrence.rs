//! Recurrence rules and next-due-date computation.
//!
//! A rule is a pure value: its textual form in the task file round-trips
//! through [`parse_recurrence`] and `Display`. The next due date is always
//! computed from the **current due date**, never from the completion date, so
//! a late completion does not compress the following interval.
//!
//! Recognised column grammar (case-insensitive):
//! empty or `none`; `daily`; `weekly`; `biweekly` or `fortnightly`;
//! `monthly`; `quarterly`; `yearly`, `annual` or `annually`; and the explicit
//! nth-weekday form `monthly (<ordinal> <weekday>)`.
//!
//! Task display names may additionally embed an nth-weekday phrase:
//! `<ordinal> <weekday>` with ordinal one of first/1st/second/2nd/third/3rd/
//! fourth/4th/last and weekday a full English name or 3-letter abbreviation,
//! parentheses optional. That phrase is only an import-time convenience: the
//! store upgrades a plain `monthly` rule through it when unambiguous.

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::clock::{self, Interval, Ordinal};

/// How a task's due date advances after completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    None,
    Daily,
    Weekly,
    Biweekly,
    /// Same day-of-month next month, clamped to month length.
    MonthlySameDay,
    /// A counted weekday of the month ("first Saturday").
    MonthlyNthWeekday { weekday: Weekday, ordinal: Ordinal },
    Quarterly,
    Yearly,
}

impl Recurrence {
    pub fn is_recurring(self) -> bool {
        self != Recurrence::None
    }

    /// The due date after `current`. `None` for the non-recurring rule, which
    /// callers must branch on before invoking, and for arithmetic that would
    /// leave the representable calendar range.
    pub fn next_due(self, current: NaiveDate) -> Option<NaiveDate> {
        match self {
            Recurrence::None => None,
            Recurrence::Daily => clock::add_interval(current, Interval::Days, 1),
            Recurrence::Weekly => clock::add_interval(current, Interval::Weeks, 1),
            Recurrence::Biweekly => clock::add_interval(current, Interval::Weeks, 2),
            Recurrence::MonthlySameDay => clock::add_interval(current, Interval::Months, 1),
            Recurrence::MonthlyNthWeekday { weekday, ordinal } => {
                // Always the following month's occurrence: recurrence moves
                // forward, never re-selects the current period.
                let anchor = clock::add_interval(current.with_day(1)?, Interval::Months, 1)?;
                clock::nth_weekday_of_month(anchor.year(), anchor.month(), weekday, ordinal)
            }
            Recurrence::Quarterly => clock::add_interval(current, Interval::Months, 3),
            Recurrence::Yearly => clock::add_interval(current, Interval::Years, 1),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::None => write!(f, ""),
            Recurrence::Daily => write!(f, "daily"),
            Recurrence::Weekly => write!(f, "weekly"),
            Recurrence::Biweekly => write!(f, "biweekly"),
            Recurrence::MonthlySameDay => write!(f, "monthly"),
            Recurrence::MonthlyNthWeekday { weekday, ordinal } => {
                write!(
                    f,
                    "monthly ({} {})",
                    ordinal.as_str(),
                    clock::weekday_name(*weekday)
                )
            }
            Recurrence::Quarterly => write!(f, "quarterly"),
            Recurrence::Yearly => write!(f, "yearly"),
        }
    }
}

impl serde::Serialize for Recurrence {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if *self == Recurrence::None {
            serializer.serialize_none()
        } else {
            serializer.collect_str(self)
        }
    }
}

/// Parse a recurrence cell. Returns the reason on failure so the store can
/// wrap it with file/line context.
pub fn parse_recurrence(s: &str) -> Result<Recurrence, String> {
    let norm = s.trim().to_lowercase();
    match norm.as_str() {
        "" | "none" => return Ok(Recurrence::None),
        "daily" => return Ok(Recurrence::Daily),
        "weekly" => return Ok(Recurrence::Weekly),
        "biweekly" | "fortnightly" => return Ok(Recurrence::Biweekly),
        "monthly" => return Ok(Recurrence::MonthlySameDay),
        "quarterly" => return Ok(Recurrence::Quarterly),
        "yearly" | "annual" | "annually" => return Ok(Recurrence::Yearly),
        _ => {}
    }
    if let Some(rest) = norm.strip_prefix("monthly") {
        let phrases = scan_phrases(rest);
        if phrases.len() == 1 {
            let (weekday, ordinal) = phrases[0];
            return Ok(Recurrence::MonthlyNthWeekday { weekday, ordinal });
        }
    }
    Err(format!("unrecognised recurrence '{}'", s.trim()))
}

fn parse_ordinal(word: &str) -> Option<Ordinal> {
    match word {
        "first" | "1st" => Some(Ordinal::First),
        "second" | "2nd" => Some(Ordinal::Second),
        "third" | "3rd" => Some(Ordinal::Third),
        "fourth" | "4th" => Some(Ordinal::Fourth),
        "last" => Some(Ordinal::Last),
        _ => None,
    }
}

/// Scan free text for `<ordinal> <weekday>` phrases. Words are split on
/// anything non-alphanumeric, so parentheses and hyphens are transparent.
/// Returns distinct matches in order of appearance.
pub fn scan_phrases(text: &str) -> Vec<(Weekday, Ordinal)> {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();

    let mut found: Vec<(Weekday, Ordinal)> = Vec::new();
    for pair in words.windows(2) {
        if let Some(ordinal) = parse_ordinal(&pair[0]) {
            if let Ok(weekday) = pair[1].parse::<Weekday>() {
                if !found.contains(&(weekday, ordinal)) {
                    found.push((weekday, ordinal));
                }
            }
        }
    }
    found
}
