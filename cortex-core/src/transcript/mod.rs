//! Claude Code transcript access
//!
//! ```text
//! stream bytes ──► TranscriptReader ──► Entry ──► content extractors
//!                  (reader.rs)          (record.rs) (content.rs)
//! ```
//!
//! Transcripts are append-only JSONL. Besides `user` and `assistant`
//! messages they carry `summary` and `file-history-snapshot` records;
//! assistant turns stream as several lines sharing one `requestId`, and tool
//! results arrive as `user` records.

mod content;
mod discover;
mod reader;
mod record;

pub use content::{
    strip_code, thinking_text, tool_calls, tool_results, visible_text, ToolCall, ToolResult,
};
pub use discover::{
    discover_transcript, encode_project_path, find_latest_transcript, find_transcript_dir,
};
pub use reader::{ReadBatch, TranscriptReader};
pub use record::{
    parse_entry, parse_value, ContentBlock, Entry, MessageEntry, SnapshotEntry, SummaryEntry,
    CONTENT_TYPE_TEXT, CONTENT_TYPE_THINKING, CONTENT_TYPE_TOOL_RESULT, CONTENT_TYPE_TOOL_USE,
    RECORD_TYPE_ASSISTANT, RECORD_TYPE_FILE_SNAPSHOT, RECORD_TYPE_SUMMARY, RECORD_TYPE_USER,
};
