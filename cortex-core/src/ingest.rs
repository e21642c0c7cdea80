//! Incremental extraction from one transcript
//!
//! ```text
//! HookState offset ──► TranscriptReader ──► ExtractionPipeline ──► EventStore
//!        ▲                                                            │
//!        └──────────────── new offset, session, time ◄────────────────┘
//! ```
//!
//! Events are appended before the cursor moves. A crash between the two
//! steps means the same lines are extracted again on the next run, so
//! delivery is at-least-once.

use crate::db::Database;
use crate::error::Result;
use crate::extract::{create_default_pipeline, ExtractionContext};
use crate::transcript::{Entry, TranscriptReader};
use crate::types::HookState;
use chrono::Utc;
use std::path::Path;

/// Outcome of one incremental extraction.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestResult {
    /// Offset the read resumed from
    pub start_offset: u64,
    /// Offset saved for the next run
    pub end_offset: u64,
    /// Entries parsed from new lines
    pub entries_read: usize,
    /// Lines that were not JSON objects
    pub skipped_lines: usize,
    /// Events appended to the store
    pub events_appended: usize,
    /// Whether this run counted a new session
    pub is_new_session: bool,
}

/// Extract events from the unread tail of `transcript_path` and advance the
/// project's resume cursor.
///
/// The cursor resets to 0 when the transcript differs from the last one seen.
/// `ctx.session_id` falls back to the session id of the first entry read.
pub fn ingest_transcript(
    db: &Database,
    project_hash: &str,
    transcript_path: &Path,
    ctx: &ExtractionContext,
) -> Result<IngestResult> {
    let state_store = db.hook_state(project_hash);
    let path_str = transcript_path.to_string_lossy().to_string();
    let start_offset = state_store.load()?.resume_offset(&path_str);

    let batch = TranscriptReader::new(transcript_path).read_from(start_offset);

    let mut ctx = ctx.clone();
    if ctx.session_id.is_empty() {
        ctx.session_id = first_session_id(&batch.entries).unwrap_or_default();
    }

    let events = create_default_pipeline().extract(&batch.entries, &ctx);
    let events_appended = db.events(project_hash).append_many(&events)?;

    let mut is_new_session = false;
    state_store.update(|state| {
        if !ctx.session_id.is_empty() && state.last_session_id != ctx.session_id {
            state.session_count += 1;
            state.last_session_id = ctx.session_id.clone();
            is_new_session = true;
        }
        advance_cursor(state, &path_str, start_offset, batch.end_offset);
        state.last_extraction_time = Utc::now().to_rfc3339();
    })?;

    let result = IngestResult {
        start_offset,
        end_offset: batch.end_offset,
        entries_read: batch.entries.len(),
        skipped_lines: batch.skipped_lines,
        events_appended,
        is_new_session,
    };

    tracing::info!(
        project = project_hash,
        path = %transcript_path.display(),
        start_offset = result.start_offset,
        end_offset = result.end_offset,
        entries = result.entries_read,
        skipped = result.skipped_lines,
        events = result.events_appended,
        "Extracted transcript"
    );
    Ok(result)
}

/// Move the cursor to `end_offset`, unless an overlapping run already saved a
/// later offset for the same transcript since this run read `start_offset`.
fn advance_cursor(state: &mut HookState, path: &str, start_offset: u64, end_offset: u64) {
    let advanced_meanwhile =
        state.last_transcript_path == path && state.last_transcript_position > start_offset;
    state.last_transcript_position = if advanced_meanwhile {
        state.last_transcript_position.max(end_offset)
    } else {
        end_offset
    };
    state.last_transcript_path = path.to_string();
}

fn first_session_id(entries: &[Entry]) -> Option<String> {
    entries
        .iter()
        .filter_map(Entry::message)
        .map(|m| m.session_id.as_str())
        .find(|id| !id.is_empty())
        .map(str::to_string)
}
