//! Integration tests for the cortex transcript and extraction pipeline
//!
//! These tests use fixture files in `tests/fixtures/claude-code/` to verify
//! the end-to-end flow from JSONL bytes to a rendered briefing.

use cortex_core::briefing::{assemble, generate_briefing, BriefingBudget};
use cortex_core::config::BriefingConfig;
use cortex_core::db::Database;
use cortex_core::extract::{extract_events, ExtractionContext};
use cortex_core::ingest::ingest_transcript;
use cortex_core::transcript::{tool_calls, tool_results, visible_text, Entry, TranscriptReader};
use cortex_core::types::EventType;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get the path to a fixture file
fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/claude-code")
        .join(name)
}

fn test_db() -> Database {
    cortex_core::logging::init_test();
    let db = Database::open_in_memory().expect("open in-memory db");
    db.migrate().expect("migrate");
    db
}

/// Copy a fixture into a temp dir so tests can append to it
fn copy_fixture(dir: &TempDir, name: &str) -> PathBuf {
    let dest = dir.path().join(name);
    std::fs::copy(fixture_path(name), &dest).unwrap();
    dest
}

fn append(path: &Path, text: &str) {
    let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

// ============================================
// Reading and parsing
// ============================================

#[test]
fn test_simple_transcript_entry_kinds() {
    let batch = TranscriptReader::new(fixture_path("transcript_simple.jsonl")).read_all();

    let kinds: Vec<&str> = batch.entries.iter().map(Entry::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "summary",
            "file-history-snapshot",
            "user",
            "assistant",
            "assistant",
            "user",
            "assistant"
        ]
    );
    assert_eq!(batch.skipped_lines, 0);

    // Ids come from different keys per record type
    assert_eq!(batch.entries[0].id(), "leaf-001");
    assert_eq!(batch.entries[1].id(), "msg-snap-001");
    assert_eq!(batch.entries[2].id(), "user-001");

    let user = batch.entries[2].message().unwrap();
    assert_eq!(user.parent_uuid, "");
    assert_eq!(user.git_branch, "main");
    assert_eq!(user.cwd, "/Users/test/project");
}

#[test]
fn test_malformed_line_is_skipped() {
    let batch = TranscriptReader::new(fixture_path("malformed.jsonl")).read_all();
    assert_eq!(batch.entries.len(), 3);
    assert_eq!(batch.skipped_lines, 1);
    assert_eq!(
        batch.end_offset,
        std::fs::metadata(fixture_path("malformed.jsonl")).unwrap().len()
    );
}

#[test]
fn test_content_extraction_from_fixture() {
    let batch = TranscriptReader::new(fixture_path("memory_tags.jsonl")).read_all();

    assert!(visible_text(&batch.entries[0]).contains("[MEMORY:preference]"));

    let calls = tool_calls(&batch.entries[2]);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "Write");

    let results = tool_results(&batch.entries[3]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].tool_use_id, "toolu_101");
    assert_eq!(results[0].content, "File created successfully");
    assert_eq!(results[0].metadata["type"], "create");
}

#[test]
fn test_split_reads_equal_single_read() {
    let dir = TempDir::new().unwrap();
    let full = TranscriptReader::new(fixture_path("transcript_simple.jsonl")).read_all();

    // Write the first three lines, read, then write the rest
    let content = std::fs::read_to_string(fixture_path("transcript_simple.jsonl")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    let path = dir.path().join("growing.jsonl");
    std::fs::write(&path, format!("{}\n", lines[..3].join("\n"))).unwrap();

    let reader = TranscriptReader::new(&path);
    let first = reader.read_from(0);
    append(&path, &format!("{}\n", lines[3..].join("\n")));
    let second = reader.read_from(first.end_offset);

    let mut combined = first.entries;
    combined.extend(second.entries);
    assert_eq!(combined, full.entries);

    let third = reader.read_from(second.end_offset);
    assert!(third.entries.is_empty());
    assert_eq!(third.end_offset, second.end_offset);
}

// ============================================
// Extraction
// ============================================

#[test]
fn test_extract_simple_transcript() {
    let batch = TranscriptReader::new(fixture_path("transcript_simple.jsonl")).read_all();
    let events = extract_events(&batch.entries, &ExtractionContext::default());

    let found: Vec<(EventType, &str)> = events
        .iter()
        .map(|e| (e.event_type, e.content.as_str()))
        .collect();
    assert_eq!(
        found,
        vec![
            (EventType::DecisionMade, "Decision: Use SQLite with WAL mode"),
            (
                EventType::ApproachRejected,
                "Rejected: Plain JSON files, no concurrent appends"
            ),
            (
                EventType::PlanCreated,
                "Plan: Create schema; Write event store"
            ),
            (EventType::PlanStepCompleted, "Completed: Create schema"),
            (
                EventType::KnowledgeAcquired,
                "Learned: SQLite needs the -shm file for WAL readers"
            ),
        ]
    );
    assert!(events.iter().all(|e| e.session_id == "session-001"));
    assert_eq!(events[0].source_id, "asst-001");
}

#[test]
fn test_extract_memory_tags_and_file_writes() {
    let batch = TranscriptReader::new(fixture_path("memory_tags.jsonl")).read_all();
    let events = extract_events(&batch.entries, &ExtractionContext::default());

    let types: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![
            EventType::PreferenceNoted,
            EventType::DecisionMade,
            EventType::FileModified
        ]
    );
    assert_eq!(events[1].content, "Summaries truncate at 80 characters");
    assert_eq!(events[2].content, "/Users/test/project/src/briefing.rs");
    assert!(events.iter().all(|e| e.git_branch == "feature/briefing"));
}

// ============================================
// End to end
// ============================================

#[test]
fn test_ingest_then_briefing() {
    let dir = TempDir::new().unwrap();
    let path = copy_fixture(&dir, "transcript_simple.jsonl");
    let db = test_db();

    let result = ingest_transcript(&db, "project", &path, &ExtractionContext::default()).unwrap();
    assert_eq!(result.entries_read, 7);
    assert_eq!(result.events_appended, 5);

    let doc = generate_briefing(&db, "project", &BriefingConfig::default(), Some("main")).unwrap();
    assert_eq!(
        doc,
        "# Decisions & Rejections\n\n\
         - Rejected: Plain JSON files, no concurrent appends\n\
         - Decision: Use SQLite with WAL mode\n\
         \n\
         ## Active Plan\n\n\
         - Plan: Create schema; Write event store\n\
         - Completed: Create schema\n\
         \n\
         ## Recent Context\n\n\
         - Learned: SQLite needs the -shm file for WAL readers\n"
    );

    // Nothing new: no duplicates
    let again = ingest_transcript(&db, "project", &path, &ExtractionContext::default()).unwrap();
    assert_eq!(again.events_appended, 0);
    assert_eq!(db.events("project").count().unwrap(), 5);
}

#[test]
fn test_briefing_budget_truncates_before_plan() {
    let db = test_db();
    let long = "detail ".repeat(30);
    let events: Vec<_> = (0..3)
        .map(|i| {
            cortex_core::Event::new(
                EventType::DecisionMade,
                format!("Decision {} {}", i, long),
                "s1",
                "",
            )
        })
        .chain(std::iter::once(cortex_core::Event::new(
            EventType::PlanCreated,
            "Plan: ship",
            "s1",
            "",
        )))
        .chain(std::iter::once(cortex_core::Event::new(
            EventType::KnowledgeAcquired,
            "Fact",
            "s1",
            "",
        )))
        .collect();
    db.events("p").append_many(&events).unwrap();

    let config = BriefingConfig {
        max_briefing_tokens: 50,
        max_full_decisions: 2,
        max_summary_decisions: 1,
        ..Default::default()
    };
    let doc = generate_briefing(&db, "p", &config, None).unwrap();
    assert!(doc.contains("# Decisions & Rejections"));
    assert!(!doc.contains("## Active Plan"));
    assert!(doc.chars().count() <= 200);

    let tiers = db.events("p").load_for_briefing(None, 30).unwrap();
    assert_eq!(doc, assemble(&tiers, &BriefingBudget::from_config(&config)));
}

#[test]
fn test_empty_store_briefing_has_no_headers() {
    let db = test_db();
    let doc = generate_briefing(&db, "nothing", &BriefingConfig::default(), None).unwrap();
    assert!(!doc.contains('#'));
}
