//! Classification of calendar events against the current instant.
//!
//! Interval semantics are half-open throughout: an event whose start equals
//! now is already in progress, and one whose end equals now is finished.

use chrono::{DateTime, Duration, FixedOffset};
use serde::Serialize;

/// Lead time in minutes under which an upcoming event counts as imminent.
pub const SOON_WINDOW_MIN: i64 = 30;

/// A read-only event from the external calendar collaborator.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// An event's temporal relation to now.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "label", rename_all = "UPPERCASE")]
pub enum EventClass {
    /// Already over (`end <= now`).
    Done,
    /// In progress (`start <= now < end`).
    Now { elapsed_min: i64 },
    /// Starts within the soon window.
    Soon { starts_in_min: i64 },
    /// Further out than the soon window.
    Later { starts_in_min: i64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedEvent {
    #[serde(flatten)]
    pub event: CalendarEvent,
    #[serde(flatten)]
    pub class: EventClass,
}

/// Label a single event relative to `now`.
pub fn classify(event: &CalendarEvent, now: DateTime<FixedOffset>) -> EventClass {
    if event.end <= now {
        return EventClass::Done;
    }
    if event.start <= now {
        return EventClass::Now {
            elapsed_min: (now - event.start).num_minutes(),
        };
    }
    let lead = event.start - now;
    if lead <= Duration::minutes(SOON_WINDOW_MIN) {
        EventClass::Soon {
            starts_in_min: lead.num_minutes(),
        }
    } else {
        EventClass::Later {
            starts_in_min: lead.num_minutes(),
        }
    }
}

/// Classify every event independently and return them in chronological order
/// of start.
pub fn classify_all(
    mut events: Vec<CalendarEvent>,
    now: DateTime<FixedOffset>,
) -> Vec<ClassifiedEvent> {
    events.sort_by_key(|e| e.start);
    events
        .into_iter()
        .map(|event| ClassifiedEvent {
            class: classify(&event, now),
            event,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(hms: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("2026-02-10T{hms}-05:00")).unwrap()
    }

    fn event(start: &str, end: &str) -> CalendarEvent {
        CalendarEvent {
            title: "Standup".into(),
            start: t(start),
            end: t(end),
        }
    }

    #[test]
    fn event_ending_exactly_now_is_done() {
        let now = t("10:00:00");
        assert_eq!(classify(&event("09:00:00", "10:00:00"), now), EventClass::Done);
    }

    #[test]
    fn event_starting_exactly_now_is_in_progress() {
        let now = t("10:00:00");
        assert_eq!(
            classify(&event("10:00:00", "10:30:00"), now),
            EventClass::Now { elapsed_min: 0 }
        );
    }

    #[test]
    fn in_progress_reports_elapsed() {
        let now = t("10:12:00");
        assert_eq!(
            classify(&event("10:00:00", "11:00:00"), now),
            EventClass::Now { elapsed_min: 12 }
        );
    }

    #[test]
    fn thirty_minute_lead_is_the_soon_boundary() {
        let now = t("10:00:00");
        assert_eq!(
            classify(&event("10:30:00", "11:00:00"), now),
            EventClass::Soon { starts_in_min: 30 }
        );
        // One second past the window tips over into later.
        assert_eq!(
            classify(&event("10:30:01", "11:00:00"), now),
            EventClass::Later { starts_in_min: 30 }
        );
    }

    #[test]
    fn distant_event_reports_lead_time() {
        let now = t("10:00:00");
        assert_eq!(
            classify(&event("13:00:00", "14:00:00"), now),
            EventClass::Later { starts_in_min: 180 }
        );
    }

    #[test]
    fn classify_all_orders_by_start() {
        let now = t("10:00:00");
        let classified = classify_all(
            vec![
                event("13:00:00", "14:00:00"),
                event("09:00:00", "09:30:00"),
                event("10:15:00", "10:45:00"),
            ],
            now,
        );
        let starts: Vec<_> = classified.iter().map(|c| c.event.start).collect();
        assert_eq!(starts, vec![t("09:00:00"), t("10:15:00"), t("13:00:00")]);
        assert_eq!(classified[0].class, EventClass::Done);
        assert_eq!(classified[1].class, EventClass::Soon { starts_in_min: 15 });
        assert_eq!(classified[2].class, EventClass::Later { starts_in_min: 180 });
    }
}
