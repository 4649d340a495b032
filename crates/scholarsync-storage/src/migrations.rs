//! Database schema migrations.
//!
//! Applies the initial schema: projects, notes, citations, and the
//! schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use scholarsync_core::error::ScholarError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), ScholarError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ScholarError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| ScholarError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), ScholarError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS projects (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            title           TEXT NOT NULL,
            description     TEXT,
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE TABLE IF NOT EXISTS notes (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id      INTEGER NOT NULL,
            title           TEXT NOT NULL DEFAULT '',
            content         TEXT NOT NULL DEFAULT '',
            type            TEXT NOT NULL DEFAULT 'note'
                            CHECK (type IN ('note', 'draft', 'summary')),
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_notes_project
            ON notes (project_id, created_at DESC);

        CREATE TABLE IF NOT EXISTS citations (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id      INTEGER NOT NULL,
            title           TEXT NOT NULL DEFAULT '',
            authors         TEXT NOT NULL DEFAULT '',
            year            TEXT NOT NULL DEFAULT '',
            url             TEXT,
            doi             TEXT,
            abstract        TEXT,
            citation_count  INTEGER NOT NULL DEFAULT 0
                            CHECK (citation_count >= 0),
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_citations_project
            ON citations (project_id, created_at DESC);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| ScholarError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    #[test]
    fn test_migrations_run_once() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        // Running again should be idempotent.
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_note_requires_existing_project() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO notes (project_id, title, content) VALUES (999, 't', 'c')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_note_type_check() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        conn.execute("INSERT INTO projects (title) VALUES ('p')", [])
            .unwrap();

        let result = conn.execute(
            "INSERT INTO notes (project_id, title, content, type) VALUES (1, 't', 'c', 'essay')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_cascade_on_project_delete() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        conn.execute("INSERT INTO projects (title) VALUES ('p')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO citations (project_id, title, authors, year) VALUES (1, 't', 'a', '2020')",
            [],
        )
        .unwrap();
        conn.execute("DELETE FROM projects WHERE id = 1", []).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM citations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_citation_count_defaults_to_zero() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        conn.execute("INSERT INTO projects (title) VALUES ('p')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO citations (project_id, title, authors, year) VALUES (1, 't', 'a', '2020')",
            [],
        )
        .unwrap();

        let count: i64 = conn
            .query_row("SELECT citation_count FROM citations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
