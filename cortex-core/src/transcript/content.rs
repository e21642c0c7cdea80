//! Content extraction from parsed entries
//!
//! Pure functions over an [`Entry`]'s blocks: visible text, reasoning text,
//! tool calls and tool results. [`strip_code`] removes code samples before
//! any pattern matching so identifiers inside code never look like prose.

use super::record::{ContentBlock, Entry};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Placeholder emitted for assistant chunks that have not streamed yet.
const NO_CONTENT_PLACEHOLDER: &str = "(no content)";

/// A tool invocation from an assistant entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Map<String, Value>,
}

/// A tool outcome from a user entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolResult {
    pub tool_use_id: String,
    /// Always flattened to a single string
    pub content: String,
    pub is_error: bool,
    /// The entry's `toolUseResult` envelope
    pub metadata: Map<String, Value>,
}

/// All visible text of an entry, newline-joined in block order.
///
/// Summary entries return their summary text. Empty blocks and the
/// `(no content)` streaming placeholder are skipped.
pub fn visible_text(entry: &Entry) -> String {
    if let Entry::Summary(summary) = entry {
        return summary.text.clone();
    }

    let parts: Vec<&str> = entry
        .blocks()
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text(text) if !text.is_empty() && text != NO_CONTENT_PLACEHOLDER => {
                Some(text.as_str())
            }
            _ => None,
        })
        .collect();

    parts.join("\n")
}

/// Extended thinking text, newline-joined; empty blocks contribute nothing.
pub fn thinking_text(entry: &Entry) -> String {
    let parts: Vec<&str> = entry
        .blocks()
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Thinking(text) if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
        .collect();

    parts.join("\n")
}

/// One [`ToolCall`] per `tool_use` block, in block order.
pub fn tool_calls(entry: &Entry) -> Vec<ToolCall> {
    entry
        .blocks()
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// One [`ToolResult`] per `tool_result` block.
///
/// List content keeps only `text` sub-blocks, newline-joined.
pub fn tool_results(entry: &Entry) -> Vec<ToolResult> {
    let Some(message) = entry.message() else {
        return Vec::new();
    };

    message
        .blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => Some(ToolResult {
                tool_use_id: tool_use_id.clone(),
                content: flatten_result_content(content),
                is_error: *is_error,
                metadata: message.tool_use_result.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn flatten_result_content(content: &Value) -> String {
    match content {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(Value::as_object)
            .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
            .map(|part| part.get("text").and_then(Value::as_str).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

fn fenced_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```[\s\S]*?```|~~~[\s\S]*?~~~").expect("valid fence regex"))
}

fn inline_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`[^`]+`").expect("valid inline code regex"))
}

/// Remove fenced code blocks, then inline code spans.
///
/// Fences go first: they may contain backticks that the inline pattern
/// would otherwise pair up across fence boundaries. A lone backtick is kept.
pub fn strip_code(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let without_fences = fenced_code_re().replace_all(text, "");
    inline_code_re().replace_all(&without_fences, "").into_owned()
}
