//! Core domain types for cortex
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Entry** | One parsed transcript record (see [`crate::transcript`]) |
//! | **Event** | A durable, typed fact derived from entries by [`crate::extract`] |
//! | **Immortal event** | Decisions and rejections; never age out of the briefing |
//! | **Resume cursor** | [`HookState`]: where the last extraction stopped |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Events
// ============================================

/// The fixed set of event kinds the extraction pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DecisionMade,
    ApproachRejected,
    PlanCreated,
    PlanStepCompleted,
    KnowledgeAcquired,
    PreferenceNoted,
    FileModified,
}

impl EventType {
    /// Every variant, in declaration order
    pub const ALL: [EventType; 7] = [
        EventType::DecisionMade,
        EventType::ApproachRejected,
        EventType::PlanCreated,
        EventType::PlanStepCompleted,
        EventType::KnowledgeAcquired,
        EventType::PreferenceNoted,
        EventType::FileModified,
    ];

    /// Returns the identifier used in database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::DecisionMade => "decision_made",
            EventType::ApproachRejected => "approach_rejected",
            EventType::PlanCreated => "plan_created",
            EventType::PlanStepCompleted => "plan_step_completed",
            EventType::KnowledgeAcquired => "knowledge_acquired",
            EventType::PreferenceNoted => "preference_noted",
            EventType::FileModified => "file_modified",
        }
    }

    /// Immortal events never expire and are budgeted first.
    pub fn is_immortal(&self) -> bool {
        matches!(self, EventType::DecisionMade | EventType::ApproachRejected)
    }

    /// Plan events form the active-plan tier.
    pub fn is_plan(&self) -> bool {
        matches!(self, EventType::PlanCreated | EventType::PlanStepCompleted)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown event type: {}", s))
    }
}

/// A durable memory event.
///
/// Created only by the extraction pipeline, appended once to the store and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// What kind of fact this is
    pub event_type: EventType,
    /// Free text, one fact
    pub content: String,
    /// Session the fact was observed in
    pub session_id: String,
    /// Git branch at the time (empty when unknown)
    pub git_branch: String,
    /// Id of the transcript entry that produced this event (provenance only)
    pub source_id: String,
    /// When the event was extracted
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Create a new event stamped with a fresh id and the current time.
    pub fn new(
        event_type: EventType,
        content: impl Into<String>,
        session_id: impl Into<String>,
        git_branch: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            content: content.into(),
            session_id: session_id.into(),
            git_branch: git_branch.into(),
            source_id: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach the id of the entry this event was derived from.
    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }
}

/// Stored events pre-grouped for briefing assembly.
#[derive(Debug, Clone, Default)]
pub struct BriefingTiers {
    /// Decisions and rejections, newest first
    pub immortal: Vec<Event>,
    /// The current plan and its completed steps, oldest first
    pub active_plan: Vec<Event>,
    /// Everything else, newest first
    pub recent: Vec<Event>,
}

impl BriefingTiers {
    pub fn is_empty(&self) -> bool {
        self.immortal.is_empty() && self.active_plan.is_empty() && self.recent.is_empty()
    }
}

// ============================================
// Resume cursor
// ============================================

/// Per-project resume cursor persisted between hook invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookState {
    /// Byte offset after the last fully processed line
    pub last_transcript_position: u64,
    /// Transcript the offset refers to
    pub last_transcript_path: String,
    /// Session id seen on the last run
    pub last_session_id: String,
    /// Number of distinct sessions processed
    pub session_count: u64,
    /// RFC 3339 time of the last successful extraction (empty if never)
    pub last_extraction_time: String,
}

impl HookState {
    /// Offset to resume from for `transcript_path`.
    ///
    /// A different transcript than last time always starts from the beginning.
    pub fn resume_offset(&self, transcript_path: &str) -> u64 {
        if self.last_transcript_path == transcript_path {
            self.last_transcript_position
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_roundtrip() {
        for t in EventType::ALL {
            assert_eq!(t.as_str().parse::<EventType>(), Ok(t));
        }
        assert!("mystery".parse::<EventType>().is_err());
    }

    #[test]
    fn test_event_type_groups() {
        assert!(EventType::DecisionMade.is_immortal());
        assert!(EventType::ApproachRejected.is_immortal());
        assert!(!EventType::PlanCreated.is_immortal());

        assert!(EventType::PlanCreated.is_plan());
        assert!(EventType::PlanStepCompleted.is_plan());
        assert!(!EventType::KnowledgeAcquired.is_plan());
        assert!(!EventType::FileModified.is_plan());
    }

    #[test]
    fn test_event_new_assigns_unique_ids() {
        let a = Event::new(EventType::DecisionMade, "Use SQLite", "s1", "main");
        let b = Event::new(EventType::DecisionMade, "Use SQLite", "s1", "main");
        assert_ne!(a.id, b.id);
        assert!(a.source_id.is_empty());
        assert_eq!(a.with_source("u1").source_id, "u1");
    }

    #[test]
    fn test_resume_offset() {
        let state = HookState {
            last_transcript_position: 420,
            last_transcript_path: "/t/a.jsonl".to_string(),
            ..Default::default()
        };
        assert_eq!(state.resume_offset("/t/a.jsonl"), 420);
        assert_eq!(state.resume_offset("/t/b.jsonl"), 0);
    }
}
