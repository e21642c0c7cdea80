//! Briefing assembly
//!
//! Renders stored events into the markdown document Claude Code loads at
//! session start. Sections are fixed and appear in this order:
//!
//! 1. `# Decisions & Rejections`: the first `max_full_decisions` immortal
//!    events in full, then up to `max_summary_decisions` more as one-line
//!    summaries
//! 2. `## Active Plan`
//! 3. `## Recent Context`
//!
//! The budget is a character ceiling derived from a token count at
//! [`CHARS_PER_TOKEN`]. Units (a header, one event line, a section's trailing
//! blank line) are appended whole. The first unit that does not fit ends the
//! document; nothing after it is attempted.

use crate::config::BriefingConfig;
use crate::db::Database;
use crate::error::Result;
use crate::types::{BriefingTiers, Event};
use std::path::Path;

/// Approximate characters per token used to turn the token budget into a
/// character ceiling.
pub const CHARS_PER_TOKEN: usize = 4;

/// Rendered in place of empty event content.
const EMPTY_CONTENT: &str = "(no content)";

/// Summary lines keep at most this many characters of the first line.
const SUMMARY_LINE_CHARS: usize = 80;

const DECISIONS_HEADER: &str = "# Decisions & Rejections\n\n";
const ACTIVE_PLAN_HEADER: &str = "## Active Plan\n\n";
const RECENT_HEADER: &str = "## Recent Context\n\n";

/// Size limits for one briefing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BriefingBudget {
    pub max_chars: usize,
    pub max_full_decisions: usize,
    pub max_summary_decisions: usize,
}

impl BriefingBudget {
    pub fn from_config(config: &BriefingConfig) -> Self {
        Self {
            max_chars: config.max_briefing_tokens.saturating_mul(CHARS_PER_TOKEN),
            max_full_decisions: config.max_full_decisions,
            max_summary_decisions: config.max_summary_decisions,
        }
    }
}

/// Accumulates whole units until one does not fit.
struct Document {
    text: String,
    used_chars: usize,
    max_chars: usize,
}

impl Document {
    fn new(max_chars: usize) -> Self {
        Self {
            text: String::new(),
            used_chars: 0,
            max_chars,
        }
    }

    /// Append `unit` if it fits; `false` means the document is finished.
    fn push(&mut self, unit: &str) -> bool {
        let len = unit.chars().count();
        if self.used_chars + len > self.max_chars {
            return false;
        }
        self.text.push_str(unit);
        self.used_chars += len;
        true
    }

    fn push_all(&mut self, units: impl IntoIterator<Item = String>) -> bool {
        units.into_iter().all(|unit| self.push(&unit))
    }
}

/// Render one event as a list item.
///
/// Full lines keep the whole trimmed content. Summary lines keep the first
/// line, cut to 80 characters with `...` appended when longer.
pub fn format_event_line(event: &Event, full: bool) -> String {
    let content = event.content.trim();
    if content.is_empty() {
        return format!("- {}\n", EMPTY_CONTENT);
    }
    if full {
        return format!("- {}\n", content);
    }

    let first_line = content.lines().next().unwrap_or_default();
    if first_line.chars().count() > SUMMARY_LINE_CHARS {
        let truncated: String = first_line.chars().take(SUMMARY_LINE_CHARS).collect();
        format!("- {}...\n", truncated)
    } else {
        format!("- {}\n", first_line)
    }
}

/// Assemble the briefing document from pre-tiered events.
pub fn assemble(tiers: &BriefingTiers, budget: &BriefingBudget) -> String {
    let mut doc = Document::new(budget.max_chars);

    let immortal_lines: Vec<String> = tiers
        .immortal
        .iter()
        .take(budget.max_full_decisions)
        .map(|e| format_event_line(e, true))
        .chain(
            tiers
                .immortal
                .iter()
                .skip(budget.max_full_decisions)
                .take(budget.max_summary_decisions)
                .map(|e| format_event_line(e, false)),
        )
        .collect();

    if !immortal_lines.is_empty() {
        if !doc.push(DECISIONS_HEADER) || !doc.push_all(immortal_lines) || !doc.push("\n") {
            return doc.text;
        }
    }

    if !tiers.active_plan.is_empty() {
        let lines = tiers.active_plan.iter().map(|e| format_event_line(e, true));
        if !doc.push(ACTIVE_PLAN_HEADER) || !doc.push_all(lines) || !doc.push("\n") {
            return doc.text;
        }
    }

    if !tiers.recent.is_empty() {
        let lines = tiers.recent.iter().map(|e| format_event_line(e, true));
        if !doc.push(RECENT_HEADER) || !doc.push_all(lines) {
            return doc.text;
        }
    }

    doc.text
}

/// Load the project's events and assemble its briefing.
///
/// `branch` filters the active plan and recent tiers; see
/// [`EventStore::load_for_briefing`](crate::db::EventStore::load_for_briefing).
pub fn generate_briefing(
    db: &Database,
    project_hash: &str,
    config: &BriefingConfig,
    branch: Option<&str>,
) -> Result<String> {
    let tiers = db
        .events(project_hash)
        .load_for_briefing(branch, config.max_recent_events)?;
    let document = assemble(&tiers, &BriefingBudget::from_config(config));

    tracing::debug!(
        project = project_hash,
        immortal = tiers.immortal.len(),
        active_plan = tiers.active_plan.len(),
        recent = tiers.recent.len(),
        chars = document.chars().count(),
        "Assembled briefing"
    );
    Ok(document)
}

/// Write a briefing, creating parent directories as needed.
pub fn write_briefing_to_file(output_path: &Path, document: &str) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output_path, document)?;
    tracing::info!(path = %output_path.display(), "Wrote briefing");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventType;

    fn ev(event_type: EventType, content: &str) -> Event {
        Event::new(event_type, content, "s1", "main")
    }

    fn budget(tokens: usize, full: usize, summary: usize) -> BriefingBudget {
        BriefingBudget {
            max_chars: tokens * CHARS_PER_TOKEN,
            max_full_decisions: full,
            max_summary_decisions: summary,
        }
    }

    fn sample_tiers() -> BriefingTiers {
        BriefingTiers {
            immortal: vec![
                ev(EventType::DecisionMade, "Use SQLite for storage"),
                ev(EventType::ApproachRejected, "Rejected MongoDB"),
            ],
            active_plan: vec![
                ev(EventType::PlanCreated, "Plan: parser; store"),
                ev(EventType::PlanStepCompleted, "Completed: parser"),
            ],
            recent: vec![ev(EventType::KnowledgeAcquired, "WAL needs shm")],
        }
    }

    #[test]
    fn test_full_document_layout() {
        let doc = assemble(&sample_tiers(), &budget(3000, 10, 20));
        assert_eq!(
            doc,
            "# Decisions & Rejections\n\n\
             - Use SQLite for storage\n\
             - Rejected MongoDB\n\
             \n\
             ## Active Plan\n\n\
             - Plan: parser; store\n\
             - Completed: parser\n\
             \n\
             ## Recent Context\n\n\
             - WAL needs shm\n"
        );
    }

    #[test]
    fn test_empty_tiers_produce_empty_document() {
        let doc = assemble(&BriefingTiers::default(), &budget(3000, 10, 20));
        assert!(doc.is_empty());
    }

    #[test]
    fn test_tight_budget_stops_before_active_plan() {
        let long = "x".repeat(120);
        let tiers = BriefingTiers {
            immortal: vec![
                ev(EventType::DecisionMade, &format!("First {}", long)),
                ev(EventType::DecisionMade, &format!("Second {}", long)),
                ev(EventType::ApproachRejected, &format!("Third {}", long)),
            ],
            active_plan: vec![ev(EventType::PlanCreated, "Plan")],
            recent: vec![ev(EventType::FileModified, "src/lib.rs")],
        };

        let doc = assemble(&tiers, &budget(50, 2, 1));
        assert!(doc.contains("# Decisions & Rejections"));
        assert!(!doc.contains("## Active Plan"));
        assert!(!doc.contains("## Recent Context"));
        assert!(doc.chars().count() <= 200);
    }

    #[test]
    fn test_never_exceeds_budget() {
        let tiers = sample_tiers();
        for max_chars in 0..200 {
            let b = BriefingBudget {
                max_chars,
                max_full_decisions: 1,
                max_summary_decisions: 1,
            };
            let doc = assemble(&tiers, &b);
            assert!(doc.chars().count() <= max_chars, "budget {}", max_chars);
        }
    }

    #[test]
    fn test_header_that_does_not_fit_ends_document() {
        // Room for nothing: no partial header
        let doc = assemble(&sample_tiers(), &budget(5, 10, 20));
        assert!(doc.is_empty());
    }

    #[test]
    fn test_full_and_summary_split() {
        let long_first_line = format!("{}\nsecond line", "a".repeat(100));
        let tiers = BriefingTiers {
            immortal: vec![
                ev(EventType::DecisionMade, "Full one"),
                ev(EventType::DecisionMade, &long_first_line),
                ev(EventType::DecisionMade, "Dropped"),
            ],
            ..Default::default()
        };
        let doc = assemble(&tiers, &budget(3000, 1, 1));
        assert!(doc.contains("- Full one\n"));
        assert!(doc.contains(&format!("- {}...\n", "a".repeat(80))));
        assert!(!doc.contains("second line"));
        assert!(!doc.contains("Dropped"));
    }

    #[test]
    fn test_summary_only_section() {
        let tiers = BriefingTiers {
            immortal: vec![ev(EventType::DecisionMade, "Only summary")],
            ..Default::default()
        };
        let doc = assemble(&tiers, &budget(3000, 0, 5));
        assert_eq!(doc, "# Decisions & Rejections\n\n- Only summary\n\n");

        let doc = assemble(&tiers, &budget(3000, 0, 0));
        assert!(doc.is_empty());
    }

    #[test]
    fn test_format_event_line() {
        assert_eq!(
            format_event_line(&ev(EventType::DecisionMade, "  padded  "), true),
            "- padded\n"
        );
        assert_eq!(
            format_event_line(&ev(EventType::DecisionMade, "   "), true),
            "- (no content)\n"
        );
        assert_eq!(
            format_event_line(&ev(EventType::DecisionMade, ""), false),
            "- (no content)\n"
        );
        assert_eq!(
            format_event_line(&ev(EventType::DecisionMade, "short\nmore"), false),
            "- short\n"
        );
        let exact = "b".repeat(80);
        assert_eq!(
            format_event_line(&ev(EventType::DecisionMade, &exact), false),
            format!("- {}\n", exact)
        );
    }

    #[test]
    fn test_generate_and_write_briefing() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.events("p")
            .append_many(&[
                ev(EventType::DecisionMade, "Use SQLite"),
                ev(EventType::KnowledgeAcquired, "Fact"),
            ])
            .unwrap();

        let doc = generate_briefing(&db, "p", &BriefingConfig::default(), None).unwrap();
        assert!(doc.starts_with("# Decisions & Rejections"));
        assert!(doc.contains("- Fact\n"));
        assert!(generate_briefing(&db, "empty", &BriefingConfig::default(), None)
            .unwrap()
            .is_empty());

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".claude/rules/cortex-briefing.md");
        write_briefing_to_file(&path, &doc).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), doc);
    }
}
