//! Timezone-aware clock and calendar arithmetic.
//!
//! All date/time decisions in the crate flow through a [`Clock`] resolved from
//! the configured IANA timezone, so that "today" is stable regardless of the
//! host's system zone. The calendar helpers are pure functions over
//! `NaiveDate` and carry the month-overflow clamping rule used by the
//! recurrence engine.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::Error;

/// A clock pinned to one resolved timezone.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    tz: Tz,
}

impl Clock {
    /// Resolve a timezone identifier. Fails with `InvalidTimezone` for
    /// anything the IANA database does not know.
    pub fn new(tz_name: &str) -> Result<Self, Error> {
        let tz = tz_name
            .parse::<Tz>()
            .map_err(|_| Error::InvalidTimezone(tz_name.to_string()))?;
        Ok(Clock { tz })
    }

    /// Current instant in the configured timezone.
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    /// Today's calendar date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

/// Calendar interval kinds for [`add_interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Days,
    Weeks,
    Months,
    Years,
}

/// Which occurrence of a weekday within a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordinal {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

impl Ordinal {
    /// Zero-based week index for the counted ordinals. `Last` has no fixed
    /// index; it is resolved by scanning backward from month end.
    fn week_index(self) -> Option<u32> {
        match self {
            Ordinal::First => Some(0),
            Ordinal::Second => Some(1),
            Ordinal::Third => Some(2),
            Ordinal::Fourth => Some(3),
            Ordinal::Last => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Ordinal::First => "first",
            Ordinal::Second => "second",
            Ordinal::Third => "third",
            Ordinal::Fourth => "fourth",
            Ordinal::Last => "last",
        }
    }
}

/// Number of days in the given month, or `None` for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    Some((first_of_next - Duration::days(1)).day())
}

/// Add a calendar interval. Month and year addition clamps the day-of-month
/// to the length of the target month: Jan 31 + 1 month is Feb 28 (or 29),
/// never Mar 3. Returns `None` only when the result leaves the representable
/// calendar range.
pub fn add_interval(date: NaiveDate, kind: Interval, n: i32) -> Option<NaiveDate> {
    match kind {
        Interval::Days => date.checked_add_signed(Duration::days(n as i64)),
        Interval::Weeks => date.checked_add_signed(Duration::days(7 * n as i64)),
        Interval::Months => {
            let total = date.year() * 12 + date.month0() as i32 + n;
            let year = total.div_euclid(12);
            let month = total.rem_euclid(12) as u32 + 1;
            let day = date.day().min(days_in_month(year, month)?);
            NaiveDate::from_ymd_opt(year, month, day)
        }
        Interval::Years => add_interval(date, Interval::Months, n.checked_mul(12)?),
    }
}

/// The date of e.g. "first Saturday of February 2026". `Ordinal::Last` scans
/// backward from month end. A counted ordinal (1st..4th) always exists in
/// every month, so `None` means the year/month itself was invalid.
pub fn nth_weekday_of_month(
    year: i32,
    month: u32,
    weekday: Weekday,
    ordinal: Ordinal,
) -> Option<NaiveDate> {
    match ordinal.week_index() {
        Some(week) => {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            let offset = (weekday.num_days_from_monday() + 7
                - first.weekday().num_days_from_monday())
                % 7;
            NaiveDate::from_ymd_opt(year, month, 1 + offset + 7 * week)
        }
        None => {
            let mut d = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month)?)?;
            while d.weekday() != weekday {
                d = d.pred_opt()?;
            }
            Some(d)
        }
    }
}

/// Next occurrence of `weekday` strictly after `from`. "Next monday" asked on
/// a Monday is a week away, not today.
pub fn next_weekday_after(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (weekday.num_days_from_monday() + 7 - from.weekday().num_days_from_monday()) % 7;
    let ahead = if ahead == 0 { 7 } else { ahead };
    from + Duration::days(ahead as i64)
}

/// Full English name for a weekday, lowercase.
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Full English name, capitalised, for display ("Saturday").
pub fn weekday_display(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn invalid_timezone_is_rejected() {
        assert!(matches!(
            Clock::new("Nowhere/Atlantis"),
            Err(Error::InvalidTimezone(_))
        ));
        assert!(Clock::new("America/New_York").is_ok());
    }

    #[test]
    fn month_addition_clamps_to_month_end() {
        assert_eq!(
            add_interval(d(2026, 1, 31), Interval::Months, 1),
            Some(d(2026, 2, 28))
        );
        // Leap year.
        assert_eq!(
            add_interval(d(2024, 1, 31), Interval::Months, 1),
            Some(d(2024, 2, 29))
        );
        assert_eq!(
            add_interval(d(2026, 3, 31), Interval::Months, 1),
            Some(d(2026, 4, 30))
        );
        // December wraps the year.
        assert_eq!(
            add_interval(d(2026, 12, 15), Interval::Months, 1),
            Some(d(2027, 1, 15))
        );
    }

    #[test]
    fn year_addition_clamps_leap_day() {
        assert_eq!(
            add_interval(d(2024, 2, 29), Interval::Years, 1),
            Some(d(2025, 2, 28))
        );
    }

    #[test]
    fn day_and_week_addition() {
        assert_eq!(
            add_interval(d(2026, 2, 26), Interval::Days, 3),
            Some(d(2026, 3, 1))
        );
        assert_eq!(
            add_interval(d(2026, 2, 2), Interval::Weeks, 2),
            Some(d(2026, 2, 16))
        );
    }

    #[test]
    fn days_in_month_handles_february() {
        assert_eq!(days_in_month(2026, 2), Some(28));
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2026, 12), Some(31));
    }

    #[test]
    fn nth_weekday_counted() {
        // February 2026 starts on a Sunday; its first Saturday is the 7th.
        assert_eq!(
            nth_weekday_of_month(2026, 2, Weekday::Sat, Ordinal::First),
            Some(d(2026, 2, 7))
        );
        assert_eq!(
            nth_weekday_of_month(2026, 2, Weekday::Sun, Ordinal::First),
            Some(d(2026, 2, 1))
        );
        assert_eq!(
            nth_weekday_of_month(2026, 2, Weekday::Sat, Ordinal::Fourth),
            Some(d(2026, 2, 28))
        );
    }

    #[test]
    fn nth_weekday_last_scans_backward() {
        assert_eq!(
            nth_weekday_of_month(2026, 1, Weekday::Fri, Ordinal::Last),
            Some(d(2026, 1, 30))
        );
        assert_eq!(
            nth_weekday_of_month(2026, 2, Weekday::Sat, Ordinal::Last),
            Some(d(2026, 2, 28))
        );
    }

    #[test]
    fn next_weekday_is_strictly_forward() {
        // 2026-02-02 is a Monday.
        assert_eq!(
            next_weekday_after(d(2026, 2, 2), Weekday::Mon),
            d(2026, 2, 9)
        );
        assert_eq!(
            next_weekday_after(d(2026, 2, 2), Weekday::Thu),
            d(2026, 2, 5)
        );
    }
}
