//! # dk - scheduling and session-state CLI
//!
//! A small command-line tool that keeps an assistant-driven note workflow
//! honest: timezone-correct date arithmetic, a durable CSV task store with
//! recurrence, calendar-event classification, and a persistent session timer
//! that gates note updates and periodic audits.
//!
//! ## Key Commands
//!
//! ```bash
//! # Consolidated session startup report
//! dk startup --scope today+tomorrow
//!
//! # Task queries and mutations
//! dk status
//! dk upcoming --days 14
//! dk complete "Clean Kitchen"
//! dk reschedule "Clean Kitchen" 2026-02-15
//!
//! # Date helpers
//! dk verify-date
//! dk weekday 2026-02-14
//! dk next-weekday saturday
//!
//! # Session timer and audits
//! dk timer-start
//! dk timer-check
//! dk timer-update
//! dk audit-check
//! dk audit-done --monthly
//! ```
//!
//! Every command accepts `--json` for stable structured output.
//!
//! ## Configuration
//!
//! | Variable                 | Default            | CLI override  |
//! |--------------------------|--------------------|---------------|
//! | `LOCAL_TIMEZONE`         | `America/New_York` | —             |
//! | `DAYKEEPER_TASKS`        | `./tasks.csv`      | `--tasks`     |
//! | `DAYKEEPER_STATE_DIR`    | `.`                | `--state-dir` |
//! | `DAYKEEPER_CALENDAR_CMD` | unset              | —             |
//!
//! Invocations are single-shot and single-threaded; durable state lives in
//! the task CSV and two small JSON state files, each rewritten atomically.
//! The tool assumes at most one invocation runs at a time.

use clap::Parser;

pub mod calendar;
pub mod cli;
pub mod clock;
pub mod cmd;
pub mod config;
pub mod error;
pub mod events;
pub mod recurrence;
pub mod startup;
pub mod store;
pub mod timer;

use cli::Cli;
use config::Config;

fn main() {
    let cli = Cli::parse();
    let config = Config::from_env().with_overrides(cli.tasks, cli.state_dir);

    if let Err(e) = cmd::run(cli.command, &config, cli.json) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
