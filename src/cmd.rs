//! Command implementations for the CLI interface.
//!
//! Every handler loads what it needs, does its work through the library
//! modules, and prints either a human-readable block or, under `--json`, the
//! corresponding report struct. The JSON shapes are the integration contract
//! for the assistant collaborator and only ever grow fields.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Weekday};
use serde::Serialize;

use crate::calendar::CalendarScope;
use crate::cli::Cli;
use crate::clock::{self, Clock, Interval};
use crate::config::Config;
use crate::error::Error;
use crate::startup::{self, CalendarSection, Section, StartupOptions};
use crate::store::{CompleteOutcome, StatusReport, Task, TaskStore};
use crate::timer::{AuditCheck, StateDir, TimerCheck};

#[derive(Subcommand)]
pub enum Commands {
    /// Show overdue, due-today, and upcoming tasks.
    Status,

    /// List active tasks due between today and a horizon.
    Upcoming {
        /// Horizon in days, inclusive.
        #[arg(long, default_value_t = 7)]
        days: i64,
    },

    /// List every task, any status, ordered by due date.
    List,

    /// Complete a task by exact name. Recurring tasks advance their due
    /// date; one-shot tasks go done.
    Complete {
        /// Task name, matched exactly (case-sensitive).
        name: String,
    },

    /// Move a task to a new due date. Manual override; ignores recurrence.
    Reschedule {
        /// Task name, matched exactly (case-sensitive).
        name: String,
        /// New due date, YYYY-MM-DD.
        date: String,
    },

    /// Print today's date, weekday, and full ISO timestamp.
    VerifyDate,

    /// Weekday of a date (today when omitted).
    Weekday {
        /// Date to resolve, YYYY-MM-DD.
        date: Option<String>,
    },

    /// The date N days from today.
    AddDays {
        /// Days to add (may be negative).
        days: i32,
    },

    /// Next occurrence of a weekday, strictly after today.
    NextWeekday {
        /// Weekday name: monday..sunday or mon..sun.
        weekday: String,
    },

    /// Record session start. Resets the note-update timer.
    TimerStart,

    /// Report minutes since the last note update. Read-only.
    TimerCheck,

    /// Record that the running note was updated just now.
    TimerUpdate,

    /// Report whether the weekly audit or monthly review is due. Read-only.
    AuditCheck,

    /// Acknowledge the weekly audit.
    AuditDone {
        /// Also acknowledge the monthly review.
        #[arg(long)]
        monthly: bool,
    },

    /// Run every startup check and emit one consolidated report.
    Startup {
        /// Skip the calendar collaborator entirely (offline mode).
        #[arg(long)]
        skip_calendar: bool,
        /// Calendar range to request.
        #[arg(long, value_enum, default_value_t = CalendarScope::Today)]
        scope: CalendarScope,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Dispatch one parsed invocation.
pub fn run(command: Commands, config: &Config, json: bool) -> Result<(), Error> {
    match command {
        Commands::Status => cmd_status(config, json),
        Commands::Upcoming { days } => cmd_upcoming(config, days, json),
        Commands::List => cmd_list(config, json),
        Commands::Complete { name } => cmd_complete(config, &name, json),
        Commands::Reschedule { name, date } => cmd_reschedule(config, &name, &date, json),
        Commands::VerifyDate => cmd_verify_date(config, json),
        Commands::Weekday { date } => cmd_weekday(config, date.as_deref(), json),
        Commands::AddDays { days } => cmd_add_days(config, days, json),
        Commands::NextWeekday { weekday } => cmd_next_weekday(config, &weekday, json),
        Commands::TimerStart => cmd_timer_start(config, json),
        Commands::TimerCheck => cmd_timer_check(config, json),
        Commands::TimerUpdate => cmd_timer_update(config, json),
        Commands::AuditCheck => cmd_audit_check(config, json),
        Commands::AuditDone { monthly } => cmd_audit_done(config, monthly, json),
        Commands::Startup {
            skip_calendar,
            scope,
        } => cmd_startup(config, StartupOptions {
            scope,
            skip_calendar,
        }, json),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

fn cmd_status(config: &Config, json: bool) -> Result<(), Error> {
    let clock = Clock::new(&config.timezone)?;
    let report = TaskStore::load(&config.tasks_path)?.status(clock.today());
    if json {
        return print_json(&report);
    }
    print_status_block(&report, "");
    Ok(())
}

/// Shared status printing, indented for embedding in the startup report.
fn print_status_block(report: &StatusReport, indent: &str) {
    println!(
        "{indent}=== Task Status as of {} ({}) ===",
        report.today,
        clock::weekday_display(report.today.weekday())
    );
    println!();

    if report.overdue.is_empty() {
        println!("{indent}No overdue tasks");
    } else {
        println!("{indent}OVERDUE:");
        for o in &report.overdue {
            let noun = if o.days_overdue == 1 { "day" } else { "days" };
            println!(
                "{indent}  [{}] {} ({} {noun} overdue)",
                o.task.due_date,
                task_label(&o.task),
                o.days_overdue
            );
        }
    }
    println!();

    if report.due_today.is_empty() {
        println!("{indent}Nothing due today");
    } else {
        println!("{indent}DUE TODAY:");
        for t in &report.due_today {
            println!("{indent}  - {}", task_label(t));
        }
    }

    if !report.upcoming.is_empty() {
        println!();
        println!("{indent}UPCOMING (next 7 days):");
        for t in &report.upcoming {
            println!(
                "{indent}  [{} {}] {}",
                t.due_date,
                t.due_date.format("%a"),
                task_label(t)
            );
        }
    }
}

#[derive(Serialize)]
struct UpcomingReport {
    today: NaiveDate,
    horizon_days: i64,
    tasks: Vec<Task>,
}

fn cmd_upcoming(config: &Config, days: i64, json: bool) -> Result<(), Error> {
    let clock = Clock::new(&config.timezone)?;
    let today = clock.today();
    let tasks = TaskStore::load(&config.tasks_path)?.upcoming(today, days);
    if json {
        return print_json(&UpcomingReport {
            today,
            horizon_days: days,
            tasks,
        });
    }
    if tasks.is_empty() {
        println!("Nothing due in the next {days} days.");
        return Ok(());
    }
    println!("=== Due within {days} days of {today} ===");
    for t in &tasks {
        println!("  [{} {}] {}", t.due_date, t.due_date.format("%a"), task_label(t));
    }
    Ok(())
}

#[derive(Serialize)]
struct ListReport {
    count: usize,
    tasks: Vec<Task>,
}

fn cmd_list(config: &Config, json: bool) -> Result<(), Error> {
    let clock = Clock::new(&config.timezone)?;
    let today = clock.today();
    let tasks = TaskStore::load(&config.tasks_path)?.list();
    if json {
        return print_json(&ListReport {
            count: tasks.len(),
            tasks,
        });
    }
    println!("=== All Tasks ({} total) ===", tasks.len());
    for t in &tasks {
        let mut flags = String::new();
        if !t.is_active() {
            flags.push_str(" done");
        } else if t.due_date < today {
            flags.push_str(" OVERDUE");
        }
        println!("[{}] {}{flags}", t.due_date, task_label(t));
    }
    Ok(())
}

fn cmd_complete(config: &Config, name: &str, json: bool) -> Result<(), Error> {
    let clock = Clock::new(&config.timezone)?;
    let mut store = TaskStore::load(&config.tasks_path)?;
    let outcome = store.complete(name)?;
    let _ = TaskStore::backup(&config.tasks_path, clock.now())?;
    store.save(&config.tasks_path)?;

    if json {
        return print_json(&outcome);
    }
    match &outcome {
        CompleteOutcome::Done { name, .. } => {
            println!("Completed: {name} (done)");
        }
        CompleteOutcome::Rescheduled {
            name,
            recurrence,
            next_due,
            ..
        } => {
            println!("Completed: {name}");
            println!(
                "  Rescheduled ({recurrence}): {next_due} ({})",
                clock::weekday_display(next_due.weekday())
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct RescheduleReport {
    name: String,
    from: NaiveDate,
    to: NaiveDate,
    external_reference: Option<String>,
}

fn cmd_reschedule(config: &Config, name: &str, date: &str, json: bool) -> Result<(), Error> {
    let clock = Clock::new(&config.timezone)?;
    let new_date = parse_date(date)?;
    let mut store = TaskStore::load(&config.tasks_path)?;
    let from = store
        .tasks
        .iter()
        .find(|t| t.name == name)
        .map(|t| t.due_date)
        .ok_or_else(|| Error::TaskNotFound(name.to_string()))?;
    let task = store.reschedule(name, new_date)?;
    let report = RescheduleReport {
        name: task.name.clone(),
        from,
        to: new_date,
        external_reference: task.external_reference.clone(),
    };
    let _ = TaskStore::backup(&config.tasks_path, clock.now())?;
    store.save(&config.tasks_path)?;

    if json {
        return print_json(&report);
    }
    println!("Rescheduled: {}", report.name);
    println!("  From: {}", report.from);
    println!("  To:   {}", report.to);
    Ok(())
}

#[derive(Serialize)]
struct DateReport {
    date: NaiveDate,
    weekday: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    iso: Option<String>,
}

fn cmd_verify_date(config: &Config, json: bool) -> Result<(), Error> {
    let clock = Clock::new(&config.timezone)?;
    let now = clock.now();
    let report = DateReport {
        date: now.date_naive(),
        weekday: clock::weekday_display(now.weekday()),
        iso: Some(now.to_rfc3339()),
    };
    if json {
        return print_json(&report);
    }
    println!("Current Date: {}", report.date);
    println!("Day of Week: {}", report.weekday);
    println!("ISO Format: {}", report.iso.as_deref().unwrap_or(""));
    Ok(())
}

fn cmd_weekday(config: &Config, date: Option<&str>, json: bool) -> Result<(), Error> {
    let clock = Clock::new(&config.timezone)?;
    let date = match date {
        Some(s) => parse_date(s)?,
        None => clock.today(),
    };
    print_date(date, json)
}

fn cmd_add_days(config: &Config, days: i32, json: bool) -> Result<(), Error> {
    let clock = Clock::new(&config.timezone)?;
    let date = clock::add_interval(clock.today(), Interval::Days, days)
        .ok_or_else(|| Error::DateOutOfRange(format!("today + {days} days")))?;
    print_date(date, json)
}

fn cmd_next_weekday(config: &Config, weekday: &str, json: bool) -> Result<(), Error> {
    let clock = Clock::new(&config.timezone)?;
    let target = weekday
        .trim()
        .to_lowercase()
        .parse::<Weekday>()
        .map_err(|_| Error::InvalidWeekday(weekday.to_string()))?;
    print_date(clock::next_weekday_after(clock.today(), target), json)
}

fn print_date(date: NaiveDate, json: bool) -> Result<(), Error> {
    let report = DateReport {
        date,
        weekday: clock::weekday_display(date.weekday()),
        iso: None,
    };
    if json {
        return print_json(&report);
    }
    println!("{} ({})", report.date, report.weekday);
    Ok(())
}

fn cmd_timer_start(config: &Config, json: bool) -> Result<(), Error> {
    let clock = Clock::new(&config.timezone)?;
    let state = StateDir::new(&config.state_dir);
    let session = state.start(clock.now().fixed_offset())?;
    if json {
        return print_json(&session);
    }
    println!(
        "Session started at {}. Timer running.",
        fmt_clock(session.session_start)
    );
    Ok(())
}

fn cmd_timer_check(config: &Config, json: bool) -> Result<(), Error> {
    let clock = Clock::new(&config.timezone)?;
    let state = StateDir::new(&config.state_dir);
    let check = state.check(clock.now().fixed_offset())?;
    if json {
        return print_json(&check);
    }
    print_timer_check(&check, "");
    Ok(())
}

fn print_timer_check(check: &TimerCheck, indent: &str) {
    match check {
        TimerCheck::Uninitialized => {
            println!("{indent}No active session. Run 'dk timer-start' first.");
        }
        TimerCheck::Running {
            current_time,
            session_start,
            minutes_since_start,
            last_update,
            minutes_since_update,
            overdue,
            minutes_remaining,
            update_count,
            threshold_minutes,
        } => {
            println!("{indent}Time: {}", fmt_clock(*current_time));
            println!(
                "{indent}Session: {minutes_since_start} min (started {})",
                fmt_clock(*session_start)
            );
            println!(
                "{indent}Last update: {minutes_since_update} min ago ({})",
                fmt_clock(*last_update)
            );
            if *overdue {
                println!("{indent}Status: OVERDUE (threshold: {threshold_minutes} min)");
            } else {
                println!(
                    "{indent}Status: OK ({minutes_remaining} min until update due)"
                );
            }
            println!("{indent}Updates this session: {update_count}");
        }
    }
}

fn cmd_timer_update(config: &Config, json: bool) -> Result<(), Error> {
    let clock = Clock::new(&config.timezone)?;
    let state = StateDir::new(&config.state_dir);
    let receipt = state.update(clock.now().fixed_offset())?;
    if json {
        return print_json(&receipt);
    }
    match receipt.minutes_since_previous {
        Some(min) => println!(
            "Note update recorded at {} ({min} min since last).",
            fmt_clock(receipt.recorded_at)
        ),
        None => println!(
            "No session was running; started one at {}.",
            fmt_clock(receipt.recorded_at)
        ),
    }
    println!("Updates this session: {}", receipt.update_count);
    Ok(())
}

fn cmd_audit_check(config: &Config, json: bool) -> Result<(), Error> {
    let clock = Clock::new(&config.timezone)?;
    let state = StateDir::new(&config.state_dir);
    let check = state.audit_check(clock.today())?;
    if json {
        return print_json(&check);
    }
    print_audit_check(&check, "");
    Ok(())
}

fn print_audit_check(check: &AuditCheck, indent: &str) {
    if check.weekly_audit_needed {
        let since = match check.days_since_weekly_audit {
            Some(days) => format!(" (last: {days}d ago)"),
            None => " (never done)".to_string(),
        };
        println!("{indent}** WEEKLY AUDIT NEEDED{since}");
    } else if let Some(days) = check.days_since_weekly_audit {
        println!("{indent}Weekly audit: OK (last: {days}d ago)");
    }

    if check.monthly_review_needed {
        println!("{indent}** MONTHLY REVIEW NEEDED (first week of month)");
    } else if check.in_first_week {
        println!("{indent}Monthly review: OK (already done this month)");
    } else {
        println!("{indent}Monthly review: not due (not first week)");
    }
}

fn cmd_audit_done(config: &Config, monthly: bool, json: bool) -> Result<(), Error> {
    let clock = Clock::new(&config.timezone)?;
    let state = StateDir::new(&config.state_dir);
    let today = clock.today();
    let audit = state.audit_done(today, monthly)?;
    if json {
        return print_json(&audit);
    }
    println!("Weekly audit recorded for {today}.");
    if monthly {
        println!("Monthly review also recorded.");
    }
    Ok(())
}

fn cmd_startup(config: &Config, options: StartupOptions, json: bool) -> Result<(), Error> {
    let clock = Clock::new(&config.timezone)?;
    let report = startup::run(&clock, config, options)?;
    if json {
        return print_json(&report);
    }

    println!(
        "=== STARTUP REPORT: {} {} ===",
        report.datetime.date, report.datetime.time
    );
    println!();

    println!("--- CALENDAR ---");
    match &report.calendar {
        CalendarSection::Skipped => println!("  [skipped]"),
        CalendarSection::Unavailable { reason } => println!("  [unavailable: {reason}]"),
        CalendarSection::Ok { events } => {
            if events.is_empty() {
                println!("  No events in scope.");
            }
            for e in events {
                println!(
                    "  {}-{}: {} [{}]",
                    fmt_clock(e.event.start),
                    fmt_clock(e.event.end),
                    e.event.title,
                    describe_class(&e.class)
                );
            }
        }
    }
    println!();

    println!("--- TASKS ---");
    print_status_block(&report.tasks, "  ");
    println!();

    println!("--- AUDITS ---");
    match &report.audit {
        Section::Ok { data } => print_audit_check(data, "  "),
        Section::Failed { reason } => println!("  [audit check unavailable: {reason}]"),
    }
    println!();

    println!("--- SESSION ---");
    match &report.timer {
        Section::Ok { data } => {
            if data.started {
                println!("  Session started. Timer running.");
            } else {
                println!("  Session already running:");
            }
            print_timer_check(&data.check, "  ");
        }
        Section::Failed { reason } => println!("  [timer error: {reason}]"),
    }

    if report.is_partial() {
        println!();
        println!("NOTE: partial report. One or more sections degraded above.");
    }
    Ok(())
}

fn describe_class(class: &crate::events::EventClass) -> String {
    use crate::events::EventClass;
    match class {
        EventClass::Done => "DONE".to_string(),
        EventClass::Now { elapsed_min } => format!("NOW, {elapsed_min} min in"),
        EventClass::Soon { starts_in_min } => format!("SOON, starts in {starts_in_min} min"),
        EventClass::Later { starts_in_min } => format!("LATER, in {starts_in_min} min"),
    }
}

pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// Name plus recurrence/priority tags, the row form shared by every listing.
fn task_label(t: &Task) -> String {
    let mut label = t.name.clone();
    if t.recurrence.is_recurring() {
        label.push_str(&format!(" [{}]", t.recurrence));
    }
    if let Some(p) = t.priority {
        label.push_str(&format!(" ({})", crate::store::format_priority(Some(p))));
    }
    label
}

fn parse_date(s: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate(s.to_string()))
}

/// Clock-face time, "9:25 am" style.
fn fmt_clock(dt: DateTime<FixedOffset>) -> String {
    dt.format("%-I:%M %p").to_string().to_lowercase()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    match serde_json::to_string_pretty(value) {
        Ok(s) => {
            println!("{s}");
            Ok(())
        }
        Err(e) => Err(Error::State {
            path: "<stdout>".into(),
            source: e,
        }),
    }
}
