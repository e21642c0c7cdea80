//! Maintenance commands: reset, status, init

use crate::open_database;
use anyhow::{Context, Result};
use cortex_core::project::identify_project;
use cortex_core::{Config, ProjectIdentity};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;

/// Print a command's output, or its error on stderr with exit code 1.
pub(crate) fn report(name: &str, result: Result<String>) -> ExitCode {
    match result {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(command = name, error = %format!("{:#}", e), "Command failed");
            eprintln!("Cortex {} error: {:#}", name, e);
            ExitCode::FAILURE
        }
    }
}

fn resolve_project(cwd: Option<PathBuf>) -> Result<ProjectIdentity> {
    let work_dir = match cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    if work_dir.as_os_str().is_empty() {
        anyhow::bail!("no working directory");
    }
    Ok(identify_project(work_dir))
}

/// Clear the project's events and resume cursor.
pub(crate) fn reset(config: &Config, cwd: Option<PathBuf>) -> Result<String> {
    let identity = resolve_project(cwd)?;
    let db = open_database(config)?;

    let removed = db
        .events(&identity.hash)
        .clear()
        .context("failed to clear events")?;
    db.hook_state(&identity.hash)
        .reset()
        .context("failed to reset hook state")?;

    tracing::info!(project = %identity.hash, removed, "Reset project memory");
    Ok(format!("Cortex memory reset for project {}.", identity.hash))
}

/// Project identity, event count and last extraction time.
pub(crate) fn status(config: &Config, cwd: Option<PathBuf>) -> Result<String> {
    let identity = resolve_project(cwd)?;
    let db = open_database(config)?;

    let count = db
        .events(&identity.hash)
        .count()
        .context("failed to count events")?;
    let state = db
        .hook_state(&identity.hash)
        .load()
        .context("failed to load hook state")?;
    let last_extraction = if state.last_extraction_time.is_empty() {
        "none"
    } else {
        state.last_extraction_time.as_str()
    };

    Ok(format!(
        "project: {}\nhash: {}\nevents: {}\nlast_extraction: {}",
        identity.path.display(),
        identity.hash,
        count,
        last_extraction
    ))
}

/// Hook configuration to paste into Claude Code's settings.
pub(crate) fn init_hook_json() -> String {
    let hook = |command: &str| {
        json!([{
            "matcher": "",
            "hooks": [{"type": "command", "command": command}],
        }])
    };
    let config = json!({
        "hooks": {
            "Stop": hook("cortex stop"),
            "PreCompact": hook("cortex precompact"),
            "SessionStart": hook("cortex session-start"),
        }
    });
    serde_json::to_string_pretty(&config).unwrap_or_else(|_| config.to_string())
}
