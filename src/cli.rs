use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// File-backed scheduling and session-state CLI.
/// Paths and the timezone default from the environment; see `main.rs`.
#[derive(Parser)]
#[command(name = "dk", version, about = "Task scheduling and session tracking CLI")]
pub struct Cli {
    /// Emit structured JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to the task CSV file.
    #[arg(long, global = true)]
    pub tasks: Option<PathBuf>,

    /// Directory holding session and audit state files.
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
