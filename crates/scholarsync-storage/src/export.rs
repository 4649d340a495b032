//! Markdown export of a whole project.

use std::fmt::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use scholarsync_core::error::ScholarError;
use scholarsync_core::types::{Citation, Note, Project};

use crate::db::Database;
use crate::repository::{CitationRepository, NoteRepository, ProjectRepository};

/// A rendered export ready to be served as a download.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectExport {
    pub file_name: String,
    pub markdown: String,
}

/// Loads a project with its notes and citations and renders it to Markdown.
#[derive(Clone)]
pub struct ProjectExporter {
    projects: ProjectRepository,
    notes: NoteRepository,
    citations: CitationRepository,
}

impl ProjectExporter {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            projects: ProjectRepository::new(Arc::clone(&db)),
            notes: NoteRepository::new(Arc::clone(&db)),
            citations: CitationRepository::new(db),
        }
    }

    /// Export a project. Returns `Ok(None)` if the project does not exist.
    pub fn export(&self, project_id: i64) -> Result<Option<ProjectExport>, ScholarError> {
        let Some(project) = self.projects.find_by_id(project_id)? else {
            return Ok(None);
        };
        let notes = self.notes.list_by_project(project_id)?;
        let citations = self.citations.list_by_project(project_id)?;
        debug!(
            project_id,
            notes = notes.len(),
            citations = citations.len(),
            "Exporting project"
        );

        Ok(Some(ProjectExport {
            file_name: export_file_name(&project.title),
            markdown: render_project_markdown(&project, &notes, &citations, Utc::now()),
        }))
    }
}

/// Download name for a project export: whitespace runs become underscores.
pub fn export_file_name(title: &str) -> String {
    let stem = title.split_whitespace().collect::<Vec<_>>().join("_");
    let stem = if stem.is_empty() { "project".to_string() } else { stem };
    format!("{}_export.md", stem)
}

/// Render a project, its notes, and its citations as a Markdown document.
pub fn render_project_markdown(
    project: &Project,
    notes: &[Note],
    citations: &[Citation],
    generated_on: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "# Project: {}", project.title);
    let _ = writeln!(out, "Generated on: {}", generated_on.format("%Y-%m-%d"));
    out.push('\n');

    out.push_str("## Notes & Drafts\n");
    for note in notes {
        let _ = writeln!(out, "### {} ({})", note.title, note.kind);
        let _ = writeln!(out, "{}", note.content);
        out.push('\n');
    }
    out.push('\n');

    out.push_str("## Citations\n");
    for c in citations {
        let _ = write!(out, "- {} by {} ({})", c.title, c.authors, c.year);
        if !c.url.is_empty() {
            let _ = write!(out, " [Link]({})", c.url);
        }
        out.push('\n');
    }
    out
}
