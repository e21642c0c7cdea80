//! # cortex-core
//!
//! Core library for cortex - persistent memory for Claude Code sessions.
//!
//! This library provides:
//! - An incremental, resumable reader for Claude Code JSONL transcripts
//! - A layered extraction pipeline that turns transcript entries into events
//! - SQLite storage for events and the per-project resume cursor
//! - A token-budgeted briefing renderer
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! ```text
//! transcript.jsonl ──► transcript ──► extract ──► db ──► briefing ──► cortex-briefing.md
//!                      (entries)     (events)            (markdown)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use cortex_core::{Config, Database};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open database
//! let db = Database::open(&config.database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//! ```

// Re-export commonly used items at the crate root
pub use briefing::{generate_briefing, write_briefing_to_file, BriefingBudget};
pub use config::Config;
pub use db::{Database, EventStore, HookStateStore};
pub use error::{Error, Result};
pub use extract::{create_default_pipeline, extract_events, ExtractionContext, ExtractionPipeline};
pub use ingest::{ingest_transcript, IngestResult};
pub use project::{current_branch, identify_project, ProjectIdentity};
pub use transcript::TranscriptReader;
pub use types::*;

// Public modules
pub mod briefing;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod logging;
pub mod project;
pub mod transcript;
pub mod types;
