//! Durable task store backed by a flat CSV file.
//!
//! The file carries one task per row under the header
//! `name,due_date,category,recurrence,priority,status,external_reference`.
//! Loading is header-driven, so column order is free and missing optional
//! columns simply load as absent; `name` and `due_date` are required, and a
//! row whose due date is empty or unparseable fails the whole load. Partial
//! data is never treated as complete data.
//!
//! Every mutation is read-modify-write of the whole file, saved through a
//! temp-file-then-rename replace so an interrupted write can never leave a
//! truncated store behind.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::Error;
use crate::recurrence::{self, Recurrence};

pub const HEADER: [&str; 7] = [
    "name",
    "due_date",
    "category",
    "recurrence",
    "priority",
    "status",
    "external_reference",
];

/// Days covered by the default upcoming window.
pub const DEFAULT_HORIZON_DAYS: i64 = 7;

/// Task importance.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Task lifecycle state. Recurring tasks never become `Done`; completion
/// advances their due date instead.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Done,
}

/// One tracked obligation. `name` is the primary key; matching is exact and
/// case-sensitive. `external_reference` is an opaque link into the note
/// service, round-tripped but never interpreted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub due_date: NaiveDate,
    pub category: Option<String>,
    pub recurrence: Recurrence,
    pub priority: Option<Priority>,
    pub status: Status,
    pub external_reference: Option<String>,
}

impl Task {
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }
}

/// In-memory task collection for the lifetime of one invocation.
#[derive(Debug, Default)]
pub struct TaskStore {
    pub tasks: Vec<Task>,
}

/// An overdue task with how many days late it is.
#[derive(Debug, Clone, Serialize)]
pub struct OverdueTask {
    #[serde(flatten)]
    pub task: Task,
    pub days_overdue: i64,
}

/// The three partitions of active tasks produced by `status`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub today: NaiveDate,
    pub overdue: Vec<OverdueTask>,
    pub due_today: Vec<Task>,
    /// Due within the next horizon days, excluding today and overdue.
    pub upcoming: Vec<Task>,
}

/// Result of completing a task, relayed to the note-service collaborator.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompleteOutcome {
    /// Non-recurring task, now terminal.
    Done {
        name: String,
        external_reference: Option<String>,
    },
    /// Recurring task, due date advanced in place.
    Rescheduled {
        name: String,
        recurrence: Recurrence,
        previous_due: NaiveDate,
        next_due: NaiveDate,
        external_reference: Option<String>,
    },
}

impl TaskStore {
    /// Load the store, failing with `StoreCorrupt` on any malformed content.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let corrupt = |line: usize, reason: String| Error::StoreCorrupt {
            path: path.display().to_string(),
            line,
            reason,
        };

        let content = fs::read_to_string(path).map_err(|e| Error::StoreUnreadable {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut lines = content.lines().enumerate();

        let (_, header_line) = lines
            .next()
            .ok_or_else(|| corrupt(1, "file is empty, header row required".into()))?;
        let header: Vec<String> = parse_csv_line(header_line)
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let col = |name: &str| header.iter().position(|h| h == name);
        let name_col =
            col("name").ok_or_else(|| corrupt(1, "missing required column 'name'".into()))?;
        let due_col = col("due_date")
            .ok_or_else(|| corrupt(1, "missing required column 'due_date'".into()))?;
        let category_col = col("category");
        let recurrence_col = col("recurrence");
        let priority_col = col("priority");
        let status_col = col("status");
        let reference_col = col("external_reference");

        fn cell<'a>(fields: &'a [String], idx: Option<usize>) -> &'a str {
            idx.and_then(|c| fields.get(c)).map_or("", |s| s.as_str())
        }

        let mut tasks = Vec::new();
        for (i, line) in lines {
            let line_no = i + 1;
            if line.trim().is_empty() {
                continue;
            }
            let fields = parse_csv_line(line);

            let name = cell(&fields, Some(name_col)).trim().to_string();
            if name.is_empty() {
                return Err(corrupt(line_no, "row has no task name".into()));
            }
            let due_raw = cell(&fields, Some(due_col)).trim();
            let due_date = NaiveDate::parse_from_str(due_raw, "%Y-%m-%d").map_err(|_| {
                corrupt(
                    line_no,
                    format!("unparseable due_date '{due_raw}' for task '{name}'"),
                )
            })?;
            let recurrence = recurrence::parse_recurrence(cell(&fields, recurrence_col))
                .map_err(|reason| corrupt(line_no, reason))?;

            tasks.push(Task {
                name,
                due_date,
                category: non_empty(cell(&fields, category_col)),
                recurrence,
                priority: parse_priority(cell(&fields, priority_col)),
                status: parse_status(cell(&fields, status_col)),
                external_reference: non_empty(cell(&fields, reference_col)),
            });
        }
        Ok(TaskStore { tasks })
    }

    /// Save the whole store atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let mut out = String::new();
        out.push_str(&HEADER.join(","));
        out.push('\n');
        for t in &self.tasks {
            let row = [
                escape_csv(&t.name),
                t.due_date.to_string(),
                escape_csv(t.category.as_deref().unwrap_or("")),
                t.recurrence.to_string(),
                format_priority(t.priority).to_string(),
                format_status(t.status).to_string(),
                escape_csv(t.external_reference.as_deref().unwrap_or("")),
            ];
            out.push_str(&row.join(","));
            out.push('\n');
        }

        let tmp = path.with_extension("csv.tmp");
        let mut f = File::create(&tmp)?;
        f.write_all(out.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Copy the current file into a timestamped `backups/` sibling before a
    /// mutating save. Returns the backup path, or `None` if there is nothing
    /// to back up yet.
    pub fn backup(path: &Path, now: DateTime<Tz>) -> Result<Option<std::path::PathBuf>, Error> {
        if !path.exists() {
            return Ok(None);
        }
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let backup_dir = parent.join("backups");
        fs::create_dir_all(&backup_dir)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("tasks");
        let backup_path =
            backup_dir.join(format!("{stem}_{}.csv", now.format("%Y%m%d_%H%M%S")));
        fs::copy(path, &backup_path)?;
        Ok(Some(backup_path))
    }

    /// Partition active tasks into overdue / due today / due within the next
    /// seven days. Each partition ascends by due date, ties broken by name.
    pub fn status(&self, today: NaiveDate) -> StatusReport {
        let horizon = today + Duration::days(DEFAULT_HORIZON_DAYS);
        let mut overdue = Vec::new();
        let mut due_today = Vec::new();
        let mut upcoming = Vec::new();

        for t in self.tasks.iter().filter(|t| t.is_active()) {
            if t.due_date < today {
                overdue.push(OverdueTask {
                    days_overdue: (today - t.due_date).num_days(),
                    task: t.clone(),
                });
            } else if t.due_date == today {
                due_today.push(t.clone());
            } else if t.due_date <= horizon {
                upcoming.push(t.clone());
            }
        }

        overdue.sort_by(|a, b| {
            (a.task.due_date, &a.task.name).cmp(&(b.task.due_date, &b.task.name))
        });
        sort_by_due(&mut due_today);
        sort_by_due(&mut upcoming);

        StatusReport {
            today,
            overdue,
            due_today,
            upcoming,
        }
    }

    /// Active tasks with `today <= due_date <= today + horizon_days`.
    pub fn upcoming(&self, today: NaiveDate, horizon_days: i64) -> Vec<Task> {
        let horizon = today + Duration::days(horizon_days);
        let mut out: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.is_active() && t.due_date >= today && t.due_date <= horizon)
            .cloned()
            .collect();
        sort_by_due(&mut out);
        out
    }

    /// Every task, any status, ascending by due date then name.
    pub fn list(&self) -> Vec<Task> {
        let mut out = self.tasks.clone();
        sort_by_due(&mut out);
        out
    }

    /// Complete the active task named exactly `name`. Non-recurring tasks go
    /// terminal; recurring ones advance their due date in place. The store is
    /// only mutated on success.
    pub fn complete(&mut self, name: &str) -> Result<CompleteOutcome, Error> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.is_active() && t.name == name)
            .ok_or_else(|| Error::TaskNotFound(name.to_string()))?;

        let rule = effective_rule(&self.tasks[idx])?;
        let task = &mut self.tasks[idx];
        if !rule.is_recurring() {
            task.status = Status::Done;
            return Ok(CompleteOutcome::Done {
                name: task.name.clone(),
                external_reference: task.external_reference.clone(),
            });
        }

        let previous_due = task.due_date;
        let next_due = rule
            .next_due(previous_due)
            .ok_or_else(|| Error::DateOutOfRange(task.name.clone()))?;
        task.due_date = next_due;
        Ok(CompleteOutcome::Rescheduled {
            name: task.name.clone(),
            recurrence: rule,
            previous_due,
            next_due,
            external_reference: task.external_reference.clone(),
        })
    }

    /// Overwrite a task's due date. An explicit manual override: recurrence
    /// is not consulted and any status matches.
    pub fn reschedule(&mut self, name: &str, new_date: NaiveDate) -> Result<&Task, Error> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::TaskNotFound(name.to_string()))?;
        task.due_date = new_date;
        Ok(task)
    }
}

/// The rule used for completion. A plain `monthly` rule is upgraded through
/// a single nth-weekday phrase embedded in the task name; several distinct
/// phrases cannot be resolved and fail the completion before any mutation.
fn effective_rule(task: &Task) -> Result<Recurrence, Error> {
    if task.recurrence != Recurrence::MonthlySameDay {
        return Ok(task.recurrence);
    }
    let phrases = recurrence::scan_phrases(&task.name);
    match phrases.len() {
        0 => Ok(Recurrence::MonthlySameDay),
        1 => {
            let (weekday, ordinal) = phrases[0];
            Ok(Recurrence::MonthlyNthWeekday { weekday, ordinal })
        }
        _ => Err(Error::AmbiguousRecurrence {
            name: task.name.clone(),
            phrases: phrases
                .iter()
                .map(|(w, o)| format!("{} {}", o.as_str(), crate::clock::weekday_name(*w)))
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

fn sort_by_due(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| (a.due_date, &a.name).cmp(&(b.due_date, &b.name)));
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Parse a status cell. Done-ish spellings from the upstream export all map
/// to `Done`; anything else, including empty, is an active task.
pub fn parse_status(s: &str) -> Status {
    match s.trim().to_lowercase().as_str() {
        "done" | "complete" | "completed" => Status::Done,
        _ => Status::Active,
    }
}

pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::Active => "active",
        Status::Done => "done",
    }
}

pub fn parse_priority(s: &str) -> Option<Priority> {
    match s.trim().to_lowercase().as_str() {
        "high" => Some(Priority::High),
        "medium" => Some(Priority::Medium),
        "low" => Some(Priority::Low),
        _ => None,
    }
}

pub fn format_priority(p: Option<Priority>) -> &'static str {
    match p {
        Some(Priority::High) => "high",
        Some(Priority::Medium) => "medium",
        Some(Priority::Low) => "low",
        None => "",
    }
}

/// Simple CSV line parser that handles quoted fields with doubled quotes.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Escaped quote
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                fields.push(current_field);
                current_field = String::new();
            }
            _ => {
                current_field.push(ch);
            }
        }
    }
    fields.push(current_field);
    fields
}

/// Quote a field when it contains a separator, quote, or newline.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
