//! Repository implementations for SQLite-backed persistence.
//!
//! Provides ProjectRepository, NoteRepository, and CitationRepository that
//! operate on the Database struct using raw SQL. Creates return the new row
//! id; deletes are idempotent.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;

use scholarsync_core::error::ScholarError;
use scholarsync_core::types::{
    Citation, NewCitation, NewNote, NewProject, Note, NoteKind, Project,
};

use crate::db::Database;

/// Repository for research projects.
#[derive(Clone)]
pub struct ProjectRepository {
    db: Arc<Database>,
}

impl ProjectRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a project. The title must be non-blank.
    pub fn create(&self, project: &NewProject) -> Result<i64, ScholarError> {
        project.validate()?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (title, description) VALUES (?1, ?2)",
                rusqlite::params![project.title.trim(), project.description],
            )
            .map_err(|e| ScholarError::Storage(format!("Failed to save project: {}", e)))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// List all projects, newest first.
    pub fn list(&self) -> Result<Vec<Project>, ScholarError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, COALESCE(description, ''), created_at
                     FROM projects
                     ORDER BY created_at DESC, id DESC",
                )
                .map_err(|e| ScholarError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| Ok(row_to_project(row)))
                .map_err(|e| ScholarError::Storage(e.to_string()))?;

            let mut projects = Vec::new();
            for row in rows {
                let project = row.map_err(|e| ScholarError::Storage(e.to_string()))??;
                projects.push(project);
            }
            Ok(projects)
        })
    }

    /// Find a project by ID.
    pub fn find_by_id(&self, id: i64) -> Result<Option<Project>, ScholarError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, title, COALESCE(description, ''), created_at
                     FROM projects WHERE id = ?1",
                    rusqlite::params![id],
                    |row| Ok(row_to_project(row)),
                )
                .optional()
                .map_err(|e| ScholarError::Storage(e.to_string()))?;

            result.transpose()
        })
    }

    /// Delete a project together with all of its notes and citations.
    pub fn delete(&self, id: i64) -> Result<(), ScholarError> {
        self.db.with_conn_mut(|conn| {
            let tx = conn
                .transaction()
                .map_err(|e| ScholarError::Storage(e.to_string()))?;
            for sql in [
                "DELETE FROM notes WHERE project_id = ?1",
                "DELETE FROM citations WHERE project_id = ?1",
                "DELETE FROM projects WHERE id = ?1",
            ] {
                tx.execute(sql, rusqlite::params![id])
                    .map_err(|e| ScholarError::Storage(format!("Failed to delete project: {}", e)))?;
            }
            tx.commit()
                .map_err(|e| ScholarError::Storage(format!("Failed to delete project: {}", e)))?;
            Ok(())
        })
    }
}

/// Repository for project notes.
#[derive(Clone)]
pub struct NoteRepository {
    db: Arc<Database>,
}

impl NoteRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a new note under `project_id`.
    pub fn create(&self, project_id: i64, note: &NewNote) -> Result<i64, ScholarError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notes (project_id, title, content, type) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![project_id, note.title, note.content, note.kind.as_str()],
            )
            .map_err(|e| map_insert_error(e, project_id, "note"))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// List the notes of a project, newest first.
    pub fn list_by_project(&self, project_id: i64) -> Result<Vec<Note>, ScholarError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, project_id, title, content, type, created_at
                     FROM notes
                     WHERE project_id = ?1
                     ORDER BY created_at DESC, id DESC",
                )
                .map_err(|e| ScholarError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![project_id], |row| Ok(row_to_note(row)))
                .map_err(|e| ScholarError::Storage(e.to_string()))?;

            let mut notes = Vec::new();
            for row in rows {
                let note = row.map_err(|e| ScholarError::Storage(e.to_string()))??;
                notes.push(note);
            }
            Ok(notes)
        })
    }

    /// Delete a note by ID.
    pub fn delete(&self, id: i64) -> Result<(), ScholarError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM notes WHERE id = ?1", rusqlite::params![id])
                .map_err(|e| ScholarError::Storage(format!("Failed to delete note: {}", e)))?;
            Ok(())
        })
    }
}

/// Repository for project citations.
#[derive(Clone)]
pub struct CitationRepository {
    db: Arc<Database>,
}

impl CitationRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a new citation under `project_id`.
    pub fn create(&self, project_id: i64, citation: &NewCitation) -> Result<i64, ScholarError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO citations
                    (project_id, title, authors, year, url, doi, abstract, citation_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    project_id,
                    citation.title,
                    citation.authors,
                    citation.year,
                    citation.url,
                    citation.doi,
                    citation.abstract_text,
                    citation.citation_count,
                ],
            )
            .map_err(|e| map_insert_error(e, project_id, "citation"))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// List the citations of a project, newest first.
    pub fn list_by_project(&self, project_id: i64) -> Result<Vec<Citation>, ScholarError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, project_id, title, authors, year,
                            COALESCE(url, ''), COALESCE(doi, ''), COALESCE(abstract, ''),
                            citation_count, created_at
                     FROM citations
                     WHERE project_id = ?1
                     ORDER BY created_at DESC, id DESC",
                )
                .map_err(|e| ScholarError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![project_id], |row| {
                    Ok(row_to_citation(row))
                })
                .map_err(|e| ScholarError::Storage(e.to_string()))?;

            let mut citations = Vec::new();
            for row in rows {
                let citation = row.map_err(|e| ScholarError::Storage(e.to_string()))??;
                citations.push(citation);
            }
            Ok(citations)
        })
    }

    /// Delete a citation by ID.
    pub fn delete(&self, id: i64) -> Result<(), ScholarError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM citations WHERE id = ?1", rusqlite::params![id])
                .map_err(|e| ScholarError::Storage(format!("Failed to delete citation: {}", e)))?;
            Ok(())
        })
    }
}

// =============================================================================
// Row mapping helpers
// =============================================================================

/// A foreign-key violation on insert means the owning project is gone.
fn map_insert_error(err: rusqlite::Error, project_id: i64, what: &str) -> ScholarError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            ScholarError::NotFound(format!("project {}", project_id))
        }
        other => ScholarError::Storage(format!("Failed to save {}: {}", what, other)),
    }
}

fn epoch_to_utc(secs: i64) -> Result<DateTime<Utc>, ScholarError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| ScholarError::Storage(format!("Invalid timestamp: {}", secs)))
}

fn row_to_project(row: &rusqlite::Row<'_>) -> Result<Project, ScholarError> {
    let get_err = |e: rusqlite::Error| ScholarError::Storage(e.to_string());
    Ok(Project {
        id: row.get(0).map_err(get_err)?,
        title: row.get(1).map_err(get_err)?,
        description: row.get(2).map_err(get_err)?,
        created_at: epoch_to_utc(row.get(3).map_err(get_err)?)?,
    })
}

fn row_to_note(row: &rusqlite::Row<'_>) -> Result<Note, ScholarError> {
    let get_err = |e: rusqlite::Error| ScholarError::Storage(e.to_string());
    let kind: String = row.get(4).map_err(get_err)?;
    Ok(Note {
        id: row.get(0).map_err(get_err)?,
        project_id: row.get(1).map_err(get_err)?,
        title: row.get(2).map_err(get_err)?,
        content: row.get(3).map_err(get_err)?,
        kind: NoteKind::normalize(Some(&kind)),
        created_at: epoch_to_utc(row.get(5).map_err(get_err)?)?,
    })
}

fn row_to_citation(row: &rusqlite::Row<'_>) -> Result<Citation, ScholarError> {
    let get_err = |e: rusqlite::Error| ScholarError::Storage(e.to_string());
    let citation_count: i64 = row.get(8).map_err(get_err)?;
    Ok(Citation {
        id: row.get(0).map_err(get_err)?,
        project_id: row.get(1).map_err(get_err)?,
        title: row.get(2).map_err(get_err)?,
        authors: row.get(3).map_err(get_err)?,
        year: row.get(4).map_err(get_err)?,
        url: row.get(5).map_err(get_err)?,
        doi: row.get(6).map_err(get_err)?,
        abstract_text: row.get(7).map_err(get_err)?,
        citation_count: u32::try_from(citation_count.max(0)).unwrap_or(u32::MAX),
        created_at: epoch_to_utc(row.get(9).map_err(get_err)?)?,
    })
}
