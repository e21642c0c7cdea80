//! `[MEMORY:<kind>] text` tags
//!
//! Users and the assistant can pin a fact by tagging a line. The tag may
//! appear anywhere in the line; the text after it, up to the next tag or the
//! end of the line, becomes the event content. Keywords are case-insensitive and accept both short forms
//! (`decision`, `learned`, ...) and event type names (`plan_created`).

use super::{Detection, EntryView, ExtractionLayer, Span};
use crate::types::EventType;
use regex::Regex;
use std::sync::OnceLock;

fn memory_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[MEMORY:\s*([A-Za-z_-]+)\s*\]").expect("valid memory tag regex")
    })
}

/// Map a tag keyword to its event type.
pub fn keyword_event_type(keyword: &str) -> Option<EventType> {
    let normalized = keyword.trim().to_ascii_lowercase().replace('-', "_");
    let event_type = match normalized.as_str() {
        "decision" | "decided" => EventType::DecisionMade,
        "rejected" | "rejection" | "reject" => EventType::ApproachRejected,
        "plan" => EventType::PlanCreated,
        "done" | "completed" | "step" => EventType::PlanStepCompleted,
        "learned" | "knowledge" | "learning" => EventType::KnowledgeAcquired,
        "preference" | "prefer" => EventType::PreferenceNoted,
        other => return other.parse().ok(),
    };
    Some(event_type)
}

/// Each tag's keyword with the text that follows it, up to the next tag.
fn tagged_segments(line: &str) -> impl Iterator<Item = (&str, &str)> {
    let tags: Vec<_> = memory_tag_re().captures_iter(line).collect();
    let ends: Vec<usize> = tags
        .iter()
        .skip(1)
        .filter_map(|caps| caps.get(0).map(|m| m.start()))
        .chain(std::iter::once(line.len()))
        .collect();

    tags.into_iter()
        .zip(ends)
        .filter_map(move |(caps, end)| {
            let tag = caps.get(0)?;
            let keyword = caps.get(1)?.as_str();
            Some((keyword, &line[tag.end()..end]))
        })
}

/// Highest-precedence layer: explicit in-band tags.
#[derive(Debug, Default)]
pub struct ExplicitLayer;

impl ExplicitLayer {
    pub fn new() -> Self {
        Self
    }
}

impl ExtractionLayer for ExplicitLayer {
    fn name(&self) -> &str {
        "explicit"
    }

    fn detect(&mut self, view: &EntryView) -> Vec<Detection> {
        let mut detections = Vec::new();
        for (index, line) in view.lines() {
            // First tag with a known keyword and non-empty text wins the line
            let found = tagged_segments(line).find_map(|(keyword, text)| {
                let event_type = keyword_event_type(keyword)?;
                let content = text.trim();
                (!content.is_empty()).then(|| (event_type, content.to_string()))
            });

            match found {
                Some((event_type, content)) => {
                    detections.push(Detection::new(Span::Line(index), event_type, content));
                }
                None if line.contains("[MEMORY:") => {
                    tracing::debug!(entry = %view.entry_id, line = index, "Unrecognized memory tag");
                }
                None => {}
            }
        }
        detections
    }
}
