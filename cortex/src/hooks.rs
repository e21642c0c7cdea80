//! Claude Code hook handlers
//!
//! Each hook receives a JSON object on stdin. Only four keys matter:
//! `cwd`, `transcript_path`, `session_id` and `stop_hook_active`. Missing or
//! mistyped keys read as empty, and unreadable stdin reads as an empty
//! payload.

use crate::open_database;
use anyhow::{Context, Result};
use cortex_core::briefing::{generate_briefing, write_briefing_to_file};
use cortex_core::config::home_dir;
use cortex_core::extract::ExtractionContext;
use cortex_core::ingest::{ingest_transcript, IngestResult};
use cortex_core::project::{current_branch, identify_project, ProjectIdentity};
use cortex_core::transcript::discover_transcript;
use cortex_core::{Config, Database};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hook {
    Stop,
    PreCompact,
    SessionStart,
}

impl Hook {
    fn as_str(&self) -> &'static str {
        match self {
            Hook::Stop => "stop",
            Hook::PreCompact => "precompact",
            Hook::SessionStart => "session-start",
        }
    }
}

/// The fields of a hook payload cortex uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct HookPayload {
    pub cwd: String,
    pub transcript_path: String,
    pub session_id: String,
    pub stop_hook_active: bool,
}

impl HookPayload {
    fn from_value(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string()
        };
        Self {
            cwd: text("cwd"),
            transcript_path: text("transcript_path"),
            session_id: text("session_id"),
            stop_hook_active: value
                .get("stop_hook_active")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}

/// Parse a payload; anything but a JSON object yields the empty payload.
pub(crate) fn read_payload(mut reader: impl Read) -> HookPayload {
    let mut input = String::new();
    if let Err(e) = reader.read_to_string(&mut input) {
        tracing::warn!(error = %e, "Failed to read hook payload");
        return HookPayload::default();
    }
    if input.trim().is_empty() {
        return HookPayload::default();
    }

    match serde_json::from_str::<Value>(&input) {
        Ok(value) if value.is_object() => HookPayload::from_value(&value),
        Ok(_) => {
            tracing::warn!("Hook payload is not a JSON object");
            HookPayload::default()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Hook payload is not valid JSON");
            HookPayload::default()
        }
    }
}

/// Run a hook against stdin. Always succeeds from the host's point of view.
pub(crate) fn run(hook: Hook, config: &Config) -> ExitCode {
    let payload = read_payload(std::io::stdin().lock());
    tracing::info!(
        hook = hook.as_str(),
        cwd = %payload.cwd,
        session = %payload.session_id,
        "Hook invoked"
    );

    let result = match hook {
        Hook::Stop => handle_stop(&payload, config).map(|_| ()),
        Hook::PreCompact => handle_precompact(&payload, config).map(|_| ()),
        Hook::SessionStart => handle_session_start(&payload, config).map(|_| ()),
    };

    if let Err(e) = result {
        tracing::error!(hook = hook.as_str(), error = %format!("{:#}", e), "Hook failed");
    }
    ExitCode::SUCCESS
}

/// Extract events from the part of the transcript written since the last run.
pub(crate) fn handle_stop(payload: &HookPayload, config: &Config) -> Result<Option<IngestResult>> {
    if payload.stop_hook_active {
        tracing::debug!("Stop hook already active, skipping extraction");
        return Ok(None);
    }
    if payload.cwd.is_empty() || payload.transcript_path.is_empty() {
        tracing::debug!("Stop payload without cwd or transcript_path");
        return Ok(None);
    }

    let identity = identify_project(&payload.cwd);
    let db = open_database(config)?;
    extract(&db, &identity, payload, Path::new(&payload.transcript_path)).map(Some)
}

/// Extract what is pending, then refresh the briefing before compaction.
///
/// Without a `transcript_path` the newest transcript Claude Code keeps for
/// `cwd` is used, if there is one.
pub(crate) fn handle_precompact(payload: &HookPayload, config: &Config) -> Result<Option<PathBuf>> {
    if payload.cwd.is_empty() {
        tracing::debug!("PreCompact payload without cwd");
        return Ok(None);
    }

    let identity = identify_project(&payload.cwd);
    let db = open_database(config)?;

    let transcript = if payload.transcript_path.is_empty() {
        discover_transcript(&home_dir(), &payload.cwd)
    } else {
        Some(PathBuf::from(&payload.transcript_path))
    };

    if let Some(transcript) = transcript {
        // The briefing is still worth writing from what is already stored
        if let Err(e) = extract(&db, &identity, payload, &transcript) {
            tracing::warn!(error = %format!("{:#}", e), "Extraction before compaction failed");
        }
    }

    write_briefing(&db, &identity, config).map(Some)
}

/// Write the briefing so Claude Code loads it into the new session.
pub(crate) fn handle_session_start(payload: &HookPayload, config: &Config) -> Result<Option<PathBuf>> {
    if payload.cwd.is_empty() {
        tracing::debug!("SessionStart payload without cwd");
        return Ok(None);
    }

    let identity = identify_project(&payload.cwd);
    let db = open_database(config)?;
    write_briefing(&db, &identity, config).map(Some)
}

fn extract(
    db: &Database,
    identity: &ProjectIdentity,
    payload: &HookPayload,
    transcript: &Path,
) -> Result<IngestResult> {
    let ctx = ExtractionContext {
        session_id: payload.session_id.clone(),
        git_branch: current_branch(&identity.path),
    };
    ingest_transcript(db, &identity.hash, transcript, &ctx)
        .context("failed to extract transcript events")
}

fn write_briefing(db: &Database, identity: &ProjectIdentity, config: &Config) -> Result<PathBuf> {
    let branch = current_branch(&identity.path);
    let document = generate_briefing(db, &identity.hash, &config.briefing, Some(branch.as_str()))
        .context("failed to generate briefing")?;

    let path = config.briefing.output_file(&identity.path);
    write_briefing_to_file(&path, &document)
        .with_context(|| format!("failed to write briefing to {}", path.display()))?;
    Ok(path)
}
