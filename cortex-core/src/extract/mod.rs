//! Event extraction pipeline
//!
//! Turns a batch of freshly read transcript entries into memory [`Event`]s.
//!
//! ## Layers
//!
//! Each detection strategy implements [`ExtractionLayer`]. The pipeline runs
//! the registered layers in registration order, which is the precedence
//! order:
//!
//! | Layer | Looks at | Produces |
//! |-------|----------|----------|
//! | [`ExplicitLayer`] | `[MEMORY:<kind>] text` tags | any event type |
//! | [`SemanticLayer`] | `Decision:`-style line markers | decisions, rejections, knowledge, preferences |
//! | [`StructuralLayer`] | tool-call shapes | plans, completed steps, modified files |
//!
//! Text layers see visible text with code removed (see
//! [`strip_code`](crate::transcript::strip_code)); thinking blocks are never
//! scanned.
//!
//! ## Claims
//!
//! Every detection names the [`Span`] it fired on. Within one entry, the
//! first layer to claim a span wins and later detections on the same span
//! are dropped, so an explicitly tagged line never also yields a semantic
//! event.

mod explicit;
mod semantic;
mod structural;

pub use explicit::{keyword_event_type, ExplicitLayer};
pub use semantic::SemanticLayer;
pub use structural::StructuralLayer;

use crate::transcript::{strip_code, tool_calls, visible_text, Entry, ToolCall};
use crate::types::{Event, EventType};
use std::collections::HashSet;

/// Location inside one entry that a detection fired on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Span {
    /// Zero-based line of the stripped visible text
    Line(usize),
    /// Zero-based tool call
    Tool(usize),
    /// One item inside a tool call's input (e.g. a todo list entry)
    ToolItem(usize, usize),
}

/// A layer's finding before it becomes an [`Event`].
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub span: Span,
    pub event_type: EventType,
    pub content: String,
}

impl Detection {
    pub fn new(span: Span, event_type: EventType, content: impl Into<String>) -> Self {
        Self {
            span,
            event_type,
            content: content.into(),
        }
    }
}

/// Session attributes used when an entry does not carry its own.
#[derive(Debug, Clone, Default)]
pub struct ExtractionContext {
    pub session_id: String,
    pub git_branch: String,
}

/// What a layer gets to see of one user/assistant entry.
#[derive(Debug, Clone)]
pub struct EntryView {
    pub entry_id: String,
    /// Visible text with fenced and inline code removed
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl EntryView {
    /// Build the view, or `None` for entries that are not messages.
    pub fn from_entry(entry: &Entry) -> Option<Self> {
        if !entry.is_message() {
            return None;
        }
        Some(Self {
            entry_id: entry.id().to_string(),
            text: strip_code(&visible_text(entry)),
            tool_calls: tool_calls(entry),
        })
    }

    /// Lines of the stripped text, numbered from zero.
    pub fn lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.text.lines().enumerate()
    }
}

/// A detection strategy.
///
/// Layers may keep state across the entries of one batch (e.g. the last seen
/// todo list); [`begin_batch`](Self::begin_batch) resets it.
pub trait ExtractionLayer: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Called once before the first entry of every batch.
    fn begin_batch(&mut self) {}

    /// Inspect one entry and report what was found.
    fn detect(&mut self, view: &EntryView) -> Vec<Detection>;
}

/// Ordered set of layers; earlier layers take precedence.
pub struct ExtractionPipeline {
    layers: Vec<Box<dyn ExtractionLayer>>,
}

impl ExtractionPipeline {
    /// Create a pipeline with no layers.
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append a layer at the lowest precedence.
    pub fn register(&mut self, layer: Box<dyn ExtractionLayer>) {
        tracing::debug!(layer = layer.name(), "Registered extraction layer");
        self.layers.push(layer);
    }

    /// Layer names in precedence order.
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    /// Extract events from one batch of entries, in entry order.
    pub fn extract(&mut self, entries: &[Entry], ctx: &ExtractionContext) -> Vec<Event> {
        for layer in &mut self.layers {
            layer.begin_batch();
        }

        let mut events = Vec::new();
        for entry in entries {
            let Some(message) = entry.message() else {
                continue;
            };
            let Some(view) = EntryView::from_entry(entry) else {
                continue;
            };

            let session_id = non_empty_or(&message.session_id, &ctx.session_id);
            let git_branch = non_empty_or(&message.git_branch, &ctx.git_branch);

            let mut claimed: HashSet<Span> = HashSet::new();
            for layer in &mut self.layers {
                for detection in layer.detect(&view) {
                    if !claimed.insert(detection.span) {
                        tracing::trace!(
                            layer = layer.name(),
                            entry = %view.entry_id,
                            span = ?detection.span,
                            "Span already claimed"
                        );
                        continue;
                    }
                    events.push(
                        Event::new(
                            detection.event_type,
                            detection.content,
                            session_id,
                            git_branch,
                        )
                        .with_source(view.entry_id.as_str()),
                    );
                }
            }
        }

        tracing::debug!(
            entries = entries.len(),
            events = events.len(),
            "Extraction batch complete"
        );
        events
    }
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Pipeline with the built-in layers in their standard precedence:
/// explicit, then semantic, then structural.
pub fn create_default_pipeline() -> ExtractionPipeline {
    let mut pipeline = ExtractionPipeline::new();
    pipeline.register(Box::new(ExplicitLayer::new()));
    pipeline.register(Box::new(SemanticLayer::new()));
    pipeline.register(Box::new(StructuralLayer::new()));
    pipeline
}

/// Run the default pipeline over one batch.
pub fn extract_events(entries: &[Entry], ctx: &ExtractionContext) -> Vec<Event> {
    create_default_pipeline().extract(entries, ctx)
}
