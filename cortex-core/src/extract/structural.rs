//! Events derived from tool-call shapes
//!
//! | Tool | Input | Event |
//! |------|-------|-------|
//! | `TodoWrite` | `todos: [{content, status}]` with 2+ items | `plan_created` when the item list changes |
//! | `TodoWrite` | an item newly at `status: completed` | `plan_step_completed` |
//! | `ExitPlanMode` | `plan` | `plan_created` from the first non-empty line |
//! | `Write`, `Edit`, `MultiEdit`, `NotebookEdit` | `file_path` / `notebook_path` | `file_modified`, once per path |
//!
//! Completions are tracked per plan: a new plan reports its completed items
//! again, even ones an earlier plan already reported. State is kept per
//! batch only. A resumed batch that sees the same todo
//! list again reports it again.

use super::{Detection, EntryView, ExtractionLayer, Span};
use crate::transcript::ToolCall;
use crate::types::EventType;
use serde_json::Value;
use std::collections::HashSet;

const TOOL_TODO_WRITE: &str = "TodoWrite";
const TOOL_EXIT_PLAN_MODE: &str = "ExitPlanMode";
const FILE_WRITE_TOOLS: &[&str] = &["Write", "Edit", "MultiEdit", "NotebookEdit"];

const STATUS_COMPLETED: &str = "completed";

/// Smallest todo list treated as a plan.
const MIN_PLAN_ITEMS: usize = 2;

#[derive(Debug, Clone)]
struct TodoItem {
    content: String,
    completed: bool,
}

/// Tool-shape layer; lowest default precedence.
#[derive(Debug, Default)]
pub struct StructuralLayer {
    /// Item texts of the last todo list reported as a plan
    current_plan: Option<Vec<String>>,
    /// Completions already reported for `current_plan`
    completed_steps: HashSet<String>,
    modified_paths: HashSet<String>,
}

impl StructuralLayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn detect_todo_write(&mut self, index: usize, call: &ToolCall) -> Vec<Detection> {
        let items = parse_todos(call.input.get("todos"));
        let mut detections = Vec::new();

        let texts: Vec<String> = items.iter().map(|item| item.content.clone()).collect();
        if texts.len() >= MIN_PLAN_ITEMS && self.current_plan.as_ref() != Some(&texts) {
            detections.push(Detection::new(
                Span::Tool(index),
                EventType::PlanCreated,
                format!("Plan: {}", texts.join("; ")),
            ));
            // Steps belong to the newest plan; its completions are reported afresh
            self.current_plan = Some(texts);
            self.completed_steps.clear();
        }

        for (item_index, item) in items.iter().enumerate() {
            if item.completed && self.completed_steps.insert(item.content.clone()) {
                detections.push(Detection::new(
                    Span::ToolItem(index, item_index),
                    EventType::PlanStepCompleted,
                    format!("Completed: {}", item.content),
                ));
            }
        }

        detections
    }

    fn detect_file_write(&mut self, index: usize, call: &ToolCall) -> Option<Detection> {
        let path = ["file_path", "notebook_path"]
            .iter()
            .find_map(|key| call.input.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .filter(|p| !p.is_empty())?;

        if !self.modified_paths.insert(path.to_string()) {
            return None;
        }
        Some(Detection::new(
            Span::Tool(index),
            EventType::FileModified,
            path,
        ))
    }
}

fn parse_todos(value: Option<&Value>) -> Vec<TodoItem> {
    let Some(Value::Array(todos)) = value else {
        return Vec::new();
    };

    todos
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|todo| {
            let content = todo.get("content").and_then(Value::as_str)?.trim();
            if content.is_empty() {
                return None;
            }
            Some(TodoItem {
                content: content.to_string(),
                completed: todo.get("status").and_then(Value::as_str) == Some(STATUS_COMPLETED),
            })
        })
        .collect()
}

/// First non-empty line of a plan, without markdown heading marks.
fn plan_headline(plan: &str) -> Option<&str> {
    plan.lines()
        .map(|line| line.trim().trim_start_matches('#').trim())
        .find(|line| !line.is_empty())
}

impl ExtractionLayer for StructuralLayer {
    fn name(&self) -> &str {
        "structural"
    }

    fn begin_batch(&mut self) {
        self.current_plan = None;
        self.completed_steps.clear();
        self.modified_paths.clear();
    }

    fn detect(&mut self, view: &EntryView) -> Vec<Detection> {
        let mut detections = Vec::new();

        for (index, call) in view.tool_calls.iter().enumerate() {
            match call.name.as_str() {
                TOOL_TODO_WRITE => detections.extend(self.detect_todo_write(index, call)),
                TOOL_EXIT_PLAN_MODE => {
                    let headline = call
                        .input
                        .get("plan")
                        .and_then(Value::as_str)
                        .and_then(plan_headline);
                    if let Some(headline) = headline {
                        detections.push(Detection::new(
                            Span::Tool(index),
                            EventType::PlanCreated,
                            headline,
                        ));
                    }
                }
                name if FILE_WRITE_TOOLS.contains(&name) => {
                    detections.extend(self.detect_file_write(index, call));
                }
                _ => {}
            }
        }

        detections
    }
}
