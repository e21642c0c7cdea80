//! Database repository layer
//!
//! One SQLite file holds every project's events and resume cursor, keyed by
//! project hash. Hook processes for concurrently open sessions may write at
//! the same time; WAL mode plus a busy timeout lets SQLite serialize them.

use crate::error::{Error, Result};
use crate::types::{BriefingTiers, Event, EventType, HookState};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How long a writer waits for another process's lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const EVENT_COLUMNS: &str =
    "id, event_type, content, session_id, git_branch, source_id, created_at";

/// Database handle (single connection)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        tracing::debug!(path = %path.display(), "Opened database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.connection();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves SQLite itself consistent
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Event log for one project
    pub fn events<'db>(&'db self, project_hash: &str) -> EventStore<'db> {
        EventStore {
            db: self,
            project_hash: project_hash.to_string(),
        }
    }

    /// Resume cursor for one project
    pub fn hook_state<'db>(&'db self, project_hash: &str) -> HookStateStore<'db> {
        HookStateStore {
            db: self,
            project_hash: project_hash.to_string(),
        }
    }
}

// ============================================
// Event log
// ============================================

/// Append-only event log scoped to one project.
pub struct EventStore<'db> {
    db: &'db Database,
    project_hash: String,
}

impl EventStore<'_> {
    pub fn project_hash(&self) -> &str {
        &self.project_hash
    }

    /// Append a single event.
    pub fn append(&self, event: &Event) -> Result<()> {
        let conn = self.db.connection();
        insert_event(&conn, &self.project_hash, event)?;
        Ok(())
    }

    /// Append events in one transaction, preserving order.
    pub fn append_many(&self, events: &[Event]) -> Result<usize> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut conn = self.db.connection();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        for event in events {
            insert_event(&tx, &self.project_hash, event)?;
        }
        tx.commit()?;

        tracing::debug!(
            project = %self.project_hash,
            count = events.len(),
            "Appended events"
        );
        Ok(events.len())
    }

    /// Number of stored events.
    pub fn count(&self) -> Result<usize> {
        let conn = self.db.connection();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE project_hash = ?1",
            [&self.project_hash],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }

    /// Delete every event of the project. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let conn = self.db.connection();
        let removed = conn.execute(
            "DELETE FROM events WHERE project_hash = ?1",
            [&self.project_hash],
        )?;
        tracing::info!(project = %self.project_hash, removed, "Cleared events");
        Ok(removed)
    }

    /// Every event in insertion order.
    pub fn all(&self) -> Result<Vec<Event>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM events WHERE project_hash = ?1 ORDER BY seq ASC",
            EVENT_COLUMNS
        ))?;
        let rows = stmt.query_map([&self.project_hash], row_to_event)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    /// Load stored events grouped into briefing tiers.
    ///
    /// - immortal: every decision and rejection, newest first, on any branch
    /// - active plan: the newest `plan_created` and the completed steps
    ///   recorded after it, oldest first
    /// - recent: the newest `max_recent` events of the other types, newest
    ///   first
    ///
    /// `branch` narrows the active plan and recent tiers to that branch;
    /// events recorded without a branch always match.
    pub fn load_for_briefing(&self, branch: Option<&str>, max_recent: usize) -> Result<BriefingTiers> {
        let conn = self.db.connection();
        let branch = branch.filter(|b| !b.is_empty());

        let immortal = query_events(
            &conn,
            &format!(
                "SELECT {} FROM events
                 WHERE project_hash = ?1 AND event_type IN ({})
                 ORDER BY seq DESC",
                EVENT_COLUMNS,
                type_list(|t| t.is_immortal()),
            ),
            params![self.project_hash],
        )?;

        let plan_events = query_events(
            &conn,
            &format!(
                "SELECT {} FROM events
                 WHERE project_hash = ?1 AND event_type IN ({})
                   AND (?2 IS NULL OR git_branch = '' OR git_branch = ?2)
                 ORDER BY seq ASC",
                EVENT_COLUMNS,
                type_list(|t| t.is_plan()),
            ),
            params![self.project_hash, branch],
        )?;

        let recent = query_events(
            &conn,
            &format!(
                "SELECT {} FROM events
                 WHERE project_hash = ?1 AND event_type IN ({})
                   AND (?2 IS NULL OR git_branch = '' OR git_branch = ?2)
                 ORDER BY seq DESC
                 LIMIT ?3",
                EVENT_COLUMNS,
                type_list(|t| !t.is_immortal() && !t.is_plan()),
            ),
            params![self.project_hash, branch, max_recent as i64],
        )?;

        Ok(BriefingTiers {
            immortal,
            active_plan: active_plan(plan_events),
            recent,
        })
    }
}

/// Newest plan and its later completed steps. Steps that precede every plan
/// belong to no active plan.
fn active_plan(plan_events: Vec<Event>) -> Vec<Event> {
    let Some(start) = plan_events
        .iter()
        .rposition(|e| e.event_type == EventType::PlanCreated)
    else {
        return Vec::new();
    };

    plan_events
        .into_iter()
        .skip(start)
        .enumerate()
        .filter(|(i, e)| *i == 0 || e.event_type == EventType::PlanStepCompleted)
        .map(|(_, e)| e)
        .collect()
}

/// SQL literal list of the event type names matching `pred`.
fn type_list(pred: impl Fn(&EventType) -> bool) -> String {
    EventType::ALL
        .iter()
        .copied()
        .filter(|t| pred(t))
        .map(|t| format!("'{}'", t.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn insert_event(conn: &Connection, project_hash: &str, event: &Event) -> rusqlite::Result<usize> {
    conn.execute(
        r#"
        INSERT INTO events (id, project_hash, event_type, content, session_id, git_branch, source_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            event.id,
            project_hash,
            event.event_type.as_str(),
            event.content,
            event.session_id,
            event.git_branch,
            event.source_id,
            event.created_at.to_rfc3339(),
        ],
    )
}

fn query_events(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, row_to_event)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::from)
}

fn row_to_event(row: &Row) -> rusqlite::Result<Event> {
    let event_type_str: String = row.get("event_type")?;
    let created_at_str: String = row.get("created_at")?;

    let event_type = event_type_str.parse::<EventType>().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Text,
            Box::new(Error::UnknownEventType(event_type_str.clone())),
        )
    })?;

    Ok(Event {
        id: row.get("id")?,
        event_type,
        content: row.get("content")?,
        session_id: row.get("session_id")?,
        git_branch: row.get("git_branch")?,
        source_id: row.get("source_id")?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

// ============================================
// Resume cursor
// ============================================

/// Persisted [`HookState`] for one project.
pub struct HookStateStore<'db> {
    db: &'db Database,
    project_hash: String,
}

impl HookStateStore<'_> {
    /// Saved state, or defaults when nothing was saved yet.
    pub fn load(&self) -> Result<HookState> {
        let conn = self.db.connection();
        load_state(&conn, &self.project_hash)
    }

    /// Replace the saved state in a single statement.
    pub fn save(&self, state: &HookState) -> Result<()> {
        let conn = self.db.connection();
        save_state(&conn, &self.project_hash, state)?;
        Ok(())
    }

    /// Read, modify and write the state inside one write transaction.
    pub fn update<F>(&self, f: F) -> Result<HookState>
    where
        F: FnOnce(&mut HookState),
    {
        let mut conn = self.db.connection();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut state = load_state(&tx, &self.project_hash)?;
        f(&mut state);
        save_state(&tx, &self.project_hash, &state)?;
        tx.commit()?;
        Ok(state)
    }

    /// Reset to defaults.
    pub fn reset(&self) -> Result<()> {
        self.save(&HookState::default())
    }
}

fn load_state(conn: &Connection, project_hash: &str) -> Result<HookState> {
    let state = conn
        .query_row(
            r#"
            SELECT last_transcript_position, last_transcript_path, last_session_id,
                   session_count, last_extraction_time
            FROM hook_state WHERE project_hash = ?1
            "#,
            [project_hash],
            |row| {
                let position: i64 = row.get(0)?;
                let session_count: i64 = row.get(3)?;
                Ok(HookState {
                    last_transcript_position: position.max(0) as u64,
                    last_transcript_path: row.get(1)?,
                    last_session_id: row.get(2)?,
                    session_count: session_count.max(0) as u64,
                    last_extraction_time: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(state.unwrap_or_default())
}

fn save_state(conn: &Connection, project_hash: &str, state: &HookState) -> rusqlite::Result<usize> {
    conn.execute(
        r#"
        INSERT INTO hook_state (project_hash, last_transcript_position, last_transcript_path,
                                last_session_id, session_count, last_extraction_time)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(project_hash) DO UPDATE SET
            last_transcript_position = excluded.last_transcript_position,
            last_transcript_path = excluded.last_transcript_path,
            last_session_id = excluded.last_session_id,
            session_count = excluded.session_count,
            last_extraction_time = excluded.last_extraction_time
        "#,
        params![
            project_hash,
            state.last_transcript_position as i64,
            state.last_transcript_path,
            state.last_session_id,
            state.session_count as i64,
            state.last_extraction_time,
        ],
    )
}
