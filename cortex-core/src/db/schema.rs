//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: event log and resume cursor
    r#"
    CREATE TABLE IF NOT EXISTS events (
        seq              INTEGER PRIMARY KEY AUTOINCREMENT,
        id               TEXT NOT NULL UNIQUE,
        project_hash     TEXT NOT NULL,
        event_type       TEXT NOT NULL,
        content          TEXT NOT NULL,
        session_id       TEXT NOT NULL DEFAULT '',
        git_branch       TEXT NOT NULL DEFAULT '',
        created_at       DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_events_project_type
        ON events(project_hash, event_type, seq);

    CREATE TABLE IF NOT EXISTS hook_state (
        project_hash             TEXT PRIMARY KEY,
        last_transcript_position INTEGER NOT NULL DEFAULT 0,
        last_transcript_path     TEXT NOT NULL DEFAULT '',
        last_session_id          TEXT NOT NULL DEFAULT '',
        session_count            INTEGER NOT NULL DEFAULT 0,
        last_extraction_time     TEXT NOT NULL DEFAULT ''
    );
    "#,
    // Version 2: provenance of each event
    r#"
    ALTER TABLE events ADD COLUMN source_id TEXT NOT NULL DEFAULT '';
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::debug!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["events", "hook_state"] {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_upgrade_from_version_one() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0]).unwrap();
        conn.execute_batch("PRAGMA user_version = 1").unwrap();
        conn.execute(
            "INSERT INTO events (id, project_hash, event_type, content, created_at)
             VALUES ('e1', 'p', 'decision_made', 'old', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        let source_id: String = conn
            .query_row("SELECT source_id FROM events WHERE id = 'e1'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(source_id, "");
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}
