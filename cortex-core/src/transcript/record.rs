//! Typed transcript entries
//!
//! Each JSONL line is a loosely shaped envelope. [`parse_entry`] turns one
//! decoded object into a closed [`Entry`] enum. Every field has a zero-value
//! default, so a record with missing or mistyped fields still produces an
//! entry instead of an error.

use serde_json::{Map, Value};

pub const RECORD_TYPE_USER: &str = "user";
pub const RECORD_TYPE_ASSISTANT: &str = "assistant";
pub const RECORD_TYPE_SUMMARY: &str = "summary";
pub const RECORD_TYPE_FILE_SNAPSHOT: &str = "file-history-snapshot";

pub const CONTENT_TYPE_TEXT: &str = "text";
pub const CONTENT_TYPE_THINKING: &str = "thinking";
pub const CONTENT_TYPE_TOOL_USE: &str = "tool_use";
pub const CONTENT_TYPE_TOOL_RESULT: &str = "tool_result";

/// One parsed transcript record.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    User(MessageEntry),
    Assistant(MessageEntry),
    Summary(SummaryEntry),
    FileSnapshot(SnapshotEntry),
    /// Unrecognized `type`; keeps the raw object for generic inspection
    Unknown { kind: String, raw: Map<String, Value> },
}

/// Envelope shared by `user` and `assistant` records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageEntry {
    pub uuid: String,
    /// Empty for root entries (`null` in the source)
    pub parent_uuid: String,
    pub session_id: String,
    /// Opaque ISO-8601 string
    pub timestamp: String,
    /// Groups the streamed chunks of one assistant turn
    pub request_id: String,
    /// True for sub-agent conversations
    pub is_sidechain: bool,
    pub git_branch: String,
    pub cwd: String,
    pub role: String,
    pub blocks: Vec<ContentBlock>,
    /// Out-of-band `toolUseResult` envelope, shared by every tool result in this entry
    pub tool_use_result: Map<String, Value>,
}

/// A compaction summary record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryEntry {
    /// Taken from `leafUuid`
    pub id: String,
    pub text: String,
}

/// A file-history snapshot record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotEntry {
    /// Taken from `messageId`
    pub id: String,
}

/// One unit of a message body.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text(String),
    Thinking(String),
    ToolUse {
        id: String,
        name: String,
        input: Map<String, Value>,
    },
    ToolResult {
        tool_use_id: String,
        /// Either a string or a list of sub-blocks; flattened on extraction
        content: Value,
        is_error: bool,
    },
}

impl Entry {
    /// The record discriminator this entry was parsed from.
    pub fn kind(&self) -> &str {
        match self {
            Entry::User(_) => RECORD_TYPE_USER,
            Entry::Assistant(_) => RECORD_TYPE_ASSISTANT,
            Entry::Summary(_) => RECORD_TYPE_SUMMARY,
            Entry::FileSnapshot(_) => RECORD_TYPE_FILE_SNAPSHOT,
            Entry::Unknown { kind, .. } => kind.as_str(),
        }
    }

    /// Identifier of the entry, whichever source key carried it.
    pub fn id(&self) -> &str {
        match self {
            Entry::User(m) | Entry::Assistant(m) => m.uuid.as_str(),
            Entry::Summary(s) => s.id.as_str(),
            Entry::FileSnapshot(s) => s.id.as_str(),
            Entry::Unknown { raw, .. } => str_field(raw, "uuid"),
        }
    }

    /// The message envelope for user/assistant entries.
    pub fn message(&self) -> Option<&MessageEntry> {
        match self {
            Entry::User(m) | Entry::Assistant(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_message(&self) -> bool {
        self.message().is_some()
    }

    /// Content blocks; empty for non-message entries.
    pub fn blocks(&self) -> &[ContentBlock] {
        self.message().map(|m| m.blocks.as_slice()).unwrap_or(&[])
    }

    pub fn has_tool_use(&self) -> bool {
        self.blocks()
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }

    pub fn has_tool_result(&self) -> bool {
        self.blocks()
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolResult { .. }))
    }

    pub fn has_thinking(&self) -> bool {
        self.blocks()
            .iter()
            .any(|b| matches!(b, ContentBlock::Thinking(_)))
    }
}

/// Parse one decoded JSONL object into an [`Entry`]. Never fails.
pub fn parse_entry(raw: &Map<String, Value>) -> Entry {
    match str_field(raw, "type") {
        RECORD_TYPE_SUMMARY => Entry::Summary(SummaryEntry {
            id: str_field(raw, "leafUuid").to_string(),
            text: str_field(raw, "summary").to_string(),
        }),
        RECORD_TYPE_FILE_SNAPSHOT => Entry::FileSnapshot(SnapshotEntry {
            id: str_field(raw, "messageId").to_string(),
        }),
        RECORD_TYPE_USER => Entry::User(parse_message(raw)),
        RECORD_TYPE_ASSISTANT => Entry::Assistant(parse_message(raw)),
        other => Entry::Unknown {
            kind: other.to_string(),
            raw: raw.clone(),
        },
    }
}

/// Parse a decoded JSON value; only objects yield an entry.
pub fn parse_value(value: &Value) -> Option<Entry> {
    value.as_object().map(parse_entry)
}

fn parse_message(raw: &Map<String, Value>) -> MessageEntry {
    let message = raw.get("message").and_then(Value::as_object);

    MessageEntry {
        uuid: str_field(raw, "uuid").to_string(),
        parent_uuid: str_field(raw, "parentUuid").to_string(),
        session_id: str_field(raw, "sessionId").to_string(),
        timestamp: str_field(raw, "timestamp").to_string(),
        request_id: str_field(raw, "requestId").to_string(),
        is_sidechain: raw
            .get("isSidechain")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        git_branch: str_field(raw, "gitBranch").to_string(),
        cwd: str_field(raw, "cwd").to_string(),
        role: message
            .map(|m| str_field(m, "role"))
            .unwrap_or_default()
            .to_string(),
        blocks: message
            .and_then(|m| m.get("content"))
            .map(normalize_content)
            .unwrap_or_default(),
        tool_use_result: object_field(raw, "toolUseResult"),
    }
}

/// A plain string becomes one text block; a list is interpreted element by
/// element; anything else yields no blocks.
fn normalize_content(content: &Value) -> Vec<ContentBlock> {
    match content {
        Value::String(text) => vec![ContentBlock::Text(text.clone())],
        Value::Array(items) => items.iter().filter_map(parse_block).collect(),
        _ => Vec::new(),
    }
}

fn parse_block(value: &Value) -> Option<ContentBlock> {
    let block = value.as_object()?;
    match str_field(block, "type") {
        CONTENT_TYPE_TEXT => Some(ContentBlock::Text(str_field(block, "text").to_string())),
        CONTENT_TYPE_THINKING => Some(ContentBlock::Thinking(
            str_field(block, "thinking").to_string(),
        )),
        CONTENT_TYPE_TOOL_USE => Some(ContentBlock::ToolUse {
            id: str_field(block, "id").to_string(),
            name: str_field(block, "name").to_string(),
            input: object_field(block, "input"),
        }),
        CONTENT_TYPE_TOOL_RESULT => Some(ContentBlock::ToolResult {
            tool_use_id: str_field(block, "tool_use_id").to_string(),
            content: block.get("content").cloned().unwrap_or(Value::Null),
            is_error: block
                .get("is_error")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }),
        // images, documents, future block types
        _ => None,
    }
}

/// String field or `""` when missing, null or not a string.
pub(crate) fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn object_field(map: &Map<String, Value>, key: &str) -> Map<String, Value> {
    map.get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Entry {
        parse_value(&value).expect("object")
    }

    #[test]
    fn test_parse_summary_record() {
        let entry = parse(json!({
            "type": "summary",
            "summary": "Working on test infrastructure",
            "leafUuid": "leaf-001",
        }));
        assert_eq!(
            entry,
            Entry::Summary(SummaryEntry {
                id: "leaf-001".to_string(),
                text: "Working on test infrastructure".to_string(),
            })
        );
        assert_eq!(entry.id(), "leaf-001");
    }

    #[test]
    fn test_parse_file_history_snapshot() {
        let entry = parse(json!({
            "type": "file-history-snapshot",
            "messageId": "snap-001",
            "snapshot": {"trackedFileBackups": {}},
        }));
        assert_eq!(entry.kind(), RECORD_TYPE_FILE_SNAPSHOT);
        assert_eq!(entry.id(), "snap-001");
        assert!(!entry.is_message());
    }

    #[test]
    fn test_parse_user_message_with_string_content() {
        let entry = parse(json!({
            "type": "user",
            "uuid": "usr-001",
            "parentUuid": null,
            "sessionId": "session-001",
            "timestamp": "2026-01-30T10:00:00.000Z",
            "isSidechain": false,
            "gitBranch": "main",
            "cwd": "/Users/test/project",
            "message": {"role": "user", "content": "Help me set up the project"},
        }));

        let Entry::User(msg) = entry else {
            panic!("expected user entry");
        };
        assert_eq!(msg.uuid, "usr-001");
        assert_eq!(msg.parent_uuid, "");
        assert_eq!(msg.session_id, "session-001");
        assert_eq!(msg.timestamp, "2026-01-30T10:00:00.000Z");
        assert!(!msg.is_sidechain);
        assert_eq!(msg.git_branch, "main");
        assert_eq!(msg.cwd, "/Users/test/project");
        assert_eq!(msg.role, "user");
        assert_eq!(
            msg.blocks,
            vec![ContentBlock::Text("Help me set up the project".to_string())]
        );
    }

    #[test]
    fn test_string_and_single_text_block_are_equivalent() {
        let as_string = parse(json!({
            "type": "user",
            "message": {"role": "user", "content": "hello"},
        }));
        let as_list = parse(json!({
            "type": "user",
            "message": {"role": "user", "content": [{"type": "text", "text": "hello"}]},
        }));
        assert_eq!(as_string, as_list);
    }

    #[test]
    fn test_parse_assistant_blocks() {
        let entry = parse(json!({
            "type": "assistant",
            "uuid": "ast-001",
            "parentUuid": "usr-001",
            "requestId": "req-001",
            "message": {
                "role": "assistant",
                "content": [
                    {"type": "thinking", "thinking": "Consider SQLite", "signature": "sig"},
                    {"type": "text", "text": "I'll help you."},
                    {"type": "tool_use", "id": "toolu_001", "name": "Bash", "input": {"command": "ls"}},
                    {"type": "image", "source": {"type": "base64"}},
                    "not a block",
                ],
            },
        }));

        assert_eq!(entry.kind(), RECORD_TYPE_ASSISTANT);
        let msg = entry.message().unwrap();
        assert_eq!(msg.parent_uuid, "usr-001");
        assert_eq!(msg.request_id, "req-001");
        // image and the bare string are dropped
        assert_eq!(msg.blocks.len(), 3);
        assert!(entry.has_thinking());
        assert!(entry.has_tool_use());
        assert!(!entry.has_tool_result());
    }

    #[test]
    fn test_parse_tool_result_and_side_channel() {
        let entry = parse(json!({
            "type": "user",
            "uuid": "usr-002",
            "toolUseResult": {"stdout": "output here", "interrupted": false},
            "message": {
                "role": "user",
                "content": [{
                    "tool_use_id": "toolu_001",
                    "type": "tool_result",
                    "content": "done",
                    "is_error": true,
                }],
            },
        }));

        let msg = entry.message().unwrap();
        assert_eq!(
            msg.blocks,
            vec![ContentBlock::ToolResult {
                tool_use_id: "toolu_001".to_string(),
                content: json!("done"),
                is_error: true,
            }]
        );
        assert_eq!(msg.tool_use_result["stdout"], json!("output here"));
    }

    #[test]
    fn test_parse_unknown_type_keeps_raw() {
        let raw = json!({"type": "unknown_type", "data": 1});
        let entry = parse(raw.clone());
        match entry {
            Entry::Unknown { kind, raw: kept } => {
                assert_eq!(kind, "unknown_type");
                assert_eq!(Value::Object(kept), raw);
            }
            other => panic!("expected unknown entry, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_and_garbage_records() {
        let entry = parse(json!({}));
        assert_eq!(entry.kind(), "");
        assert_eq!(entry.id(), "");

        // Every field has the wrong type; defaults win.
        let entry = parse(json!({
            "type": "assistant",
            "uuid": 42,
            "parentUuid": ["x"],
            "isSidechain": "yes",
            "gitBranch": null,
            "message": {"role": 7, "content": 3.5},
        }));
        assert_eq!(entry.message(), Some(&MessageEntry::default()));
    }

    #[test]
    fn test_parse_missing_message_key() {
        let entry = parse(json!({"type": "user", "uuid": "u1"}));
        let msg = entry.message().unwrap();
        assert_eq!(msg.role, "");
        assert!(msg.blocks.is_empty());
    }

    #[test]
    fn test_parse_sidechain_true() {
        let entry = parse(json!({"type": "assistant", "isSidechain": true}));
        assert!(entry.message().unwrap().is_sidechain);
    }

    #[test]
    fn test_non_object_values_yield_nothing() {
        assert!(parse_value(&json!([1, 2, 3])).is_none());
        assert!(parse_value(&json!("just a string")).is_none());
        assert!(parse_value(&json!(42)).is_none());
    }
}
