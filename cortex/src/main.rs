//! cortex - persistent memory for Claude Code sessions
//!
//! Runs as a Claude Code hook and as a small maintenance CLI:
//! - `stop`, `precompact`, `session-start`: hook handlers reading a JSON
//!   payload on stdin. They always exit 0 so a failure never blocks the
//!   host session.
//! - `reset`, `status`, `init`: maintenance commands.
//!
//! File locations follow the XDG Base Directory layout:
//! - Database: $XDG_DATA_HOME/cortex/cortex.db (~/.local/share/cortex/cortex.db)
//! - Logs: $XDG_STATE_HOME/cortex/cortex.log (~/.local/state/cortex/cortex.log)
//! - Config: $XDG_CONFIG_HOME/cortex/config.toml (~/.config/cortex/config.toml)

mod commands;
mod hooks;

use clap::{Parser, Subcommand};
use cortex_core::{Config, Database};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cortex")]
#[command(about = "Event-sourced session memory for Claude Code")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stop hook: extract events from the new part of the transcript
    Stop,

    /// PreCompact hook: extract, then refresh the briefing
    Precompact,

    /// SessionStart hook: write the briefing for the project
    #[command(alias = "sessionstart")]
    SessionStart,

    /// Clear all events and the resume cursor for a project
    Reset {
        /// Project directory (default: current directory)
        #[arg(long)]
        cwd: Option<PathBuf>,
    },

    /// Show project identity, event count and last extraction time
    Status {
        /// Project directory (default: current directory)
        #[arg(long)]
        cwd: Option<PathBuf>,
    },

    /// Print the hook configuration for Claude Code settings
    Init,
}

/// Open the configured database and bring its schema up to date.
pub(crate) fn open_database(config: &Config) -> anyhow::Result<Database> {
    use anyhow::Context;

    let db_path = config.database_path();
    tracing::debug!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;
    Ok(db)
}

fn main() -> ExitCode {
    let args = Args::parse();

    // A broken config must not break the hooks; fall back to defaults
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let _log_guard = cortex_core::logging::init(&config.logging).ok();
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "Failed to load configuration, using defaults");
    }

    match args.command {
        Command::Stop => hooks::run(hooks::Hook::Stop, &config),
        Command::Precompact => hooks::run(hooks::Hook::PreCompact, &config),
        Command::SessionStart => hooks::run(hooks::Hook::SessionStart, &config),
        Command::Reset { cwd } => commands::report("reset", commands::reset(&config, cwd)),
        Command::Status { cwd } => commands::report("status", commands::status(&config, cwd)),
        Command::Init => {
            println!("{}", commands::init_hook_json());
            ExitCode::SUCCESS
        }
    }
}
