//! Line-initial markers such as `Decision: use SQLite`
//!
//! Markers are case-sensitive and must start the line, optionally after
//! indentation and a `-` or `*` bullet. Mid-sentence mentions ("the decision:
//! ...") are prose, not markers.

use super::{Detection, EntryView, ExtractionLayer, Span};
use crate::types::EventType;
use regex::Regex;
use std::sync::OnceLock;

/// Marker token and the event type it produces.
const MARKERS: &[(&str, EventType)] = &[
    ("Decision", EventType::DecisionMade),
    ("Rejected", EventType::ApproachRejected),
    ("Learned", EventType::KnowledgeAcquired),
    ("Preference", EventType::PreferenceNoted),
];

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*]\s+)?(Decision|Rejected|Learned|Preference):\s*(\S.*)$")
            .expect("valid marker regex")
    })
}

fn marker_event_type(marker: &str) -> Option<EventType> {
    MARKERS
        .iter()
        .find(|(token, _)| *token == marker)
        .map(|(_, event_type)| *event_type)
}

/// Pattern layer over stripped visible text.
#[derive(Debug, Default)]
pub struct SemanticLayer;

impl SemanticLayer {
    pub fn new() -> Self {
        Self
    }
}

impl ExtractionLayer for SemanticLayer {
    fn name(&self) -> &str {
        "semantic"
    }

    fn detect(&mut self, view: &EntryView) -> Vec<Detection> {
        view.lines()
            .filter_map(|(index, line)| {
                let caps = marker_re().captures(line)?;
                let marker = caps.get(1)?.as_str();
                let event_type = marker_event_type(marker)?;
                let text = caps.get(2)?.as_str().trim();
                Some(Detection::new(
                    Span::Line(index),
                    event_type,
                    format!("{}: {}", marker, text),
                ))
            })
            .collect()
    }
}
