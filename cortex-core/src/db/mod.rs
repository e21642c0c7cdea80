//! Database layer for cortex
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - A per-project append-only event log
//! - The per-project resume cursor used by the hooks

pub mod repo;
pub mod schema;

pub use repo::{Database, EventStore, HookStateStore};
