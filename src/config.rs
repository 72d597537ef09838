//! Runtime configuration resolved once at process start.
//!
//! Every knob is an environment variable with a documented default, and the
//! file-path knobs can additionally be overridden per invocation via global
//! CLI flags:
//!
//! | Variable                 | Default              | Meaning                         |
//! |--------------------------|----------------------|---------------------------------|
//! | `LOCAL_TIMEZONE`         | `America/New_York`   | IANA timezone for all arithmetic |
//! | `DAYKEEPER_TASKS`        | `./tasks.csv`        | Task store CSV path             |
//! | `DAYKEEPER_STATE_DIR`    | `.`                  | Session/audit state directory   |
//! | `DAYKEEPER_CALENDAR_CMD` | unset                | External calendar query command |

use std::path::PathBuf;

pub const ENV_TIMEZONE: &str = "LOCAL_TIMEZONE";
pub const ENV_TASKS: &str = "DAYKEEPER_TASKS";
pub const ENV_STATE_DIR: &str = "DAYKEEPER_STATE_DIR";
pub const ENV_CALENDAR_CMD: &str = "DAYKEEPER_CALENDAR_CMD";

pub const DEFAULT_TIMEZONE: &str = "America/New_York";
pub const DEFAULT_TASKS: &str = "tasks.csv";

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub timezone: String,
    pub tasks_path: PathBuf,
    pub state_dir: PathBuf,
    pub calendar_cmd: Option<String>,
}

impl Config {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Config {
            timezone: std::env::var(ENV_TIMEZONE).unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string()),
            tasks_path: std::env::var(ENV_TASKS)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_TASKS)),
            state_dir: std::env::var(ENV_STATE_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            calendar_cmd: std::env::var(ENV_CALENDAR_CMD).ok(),
        }
    }

    /// Apply per-invocation CLI overrides on top of the environment.
    pub fn with_overrides(mut self, tasks: Option<PathBuf>, state_dir: Option<PathBuf>) -> Self {
        if let Some(p) = tasks {
            self.tasks_path = p;
        }
        if let Some(d) = state_dir {
            self.state_dir = d;
        }
        self
    }
}
