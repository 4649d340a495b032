//! The persistence operations a chat turn needs.

use std::sync::Arc;

use scholarsync_core::error::ScholarError;
use scholarsync_core::types::{Citation, NewCitation, NewNote, Note};
use scholarsync_storage::{CitationRepository, Database, NoteRepository};

/// Note and citation persistence as seen by the turn orchestrator.
pub trait ResearchStore: Send + Sync {
    fn create_note(&self, project_id: i64, note: &NewNote) -> Result<i64, ScholarError>;
    fn create_citation(&self, project_id: i64, citation: &NewCitation)
        -> Result<i64, ScholarError>;
    fn list_notes(&self, project_id: i64) -> Result<Vec<Note>, ScholarError>;
    fn list_citations(&self, project_id: i64) -> Result<Vec<Citation>, ScholarError>;
}

/// [`ResearchStore`] backed by the SQLite repositories.
#[derive(Clone)]
pub struct SqliteResearchStore {
    notes: NoteRepository,
    citations: CitationRepository,
}

impl SqliteResearchStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            notes: NoteRepository::new(Arc::clone(&db)),
            citations: CitationRepository::new(db),
        }
    }
}

impl ResearchStore for SqliteResearchStore {
    fn create_note(&self, project_id: i64, note: &NewNote) -> Result<i64, ScholarError> {
        self.notes.create(project_id, note)
    }

    fn create_citation(
        &self,
        project_id: i64,
        citation: &NewCitation,
    ) -> Result<i64, ScholarError> {
        self.citations.create(project_id, citation)
    }

    fn list_notes(&self, project_id: i64) -> Result<Vec<Note>, ScholarError> {
        self.notes.list_by_project(project_id)
    }

    fn list_citations(&self, project_id: i64) -> Result<Vec<Citation>, ScholarError> {
        self.citations.list_by_project(project_id)
    }
}
