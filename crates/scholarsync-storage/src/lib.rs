//! ScholarSync storage crate - SQLite persistence and project export.
//!
//! Provides a WAL-mode SQLite database with migrations, repositories for
//! projects, notes, and citations, and Markdown export of a whole project.

pub mod db;
pub mod export;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use export::{export_file_name, render_project_markdown, ProjectExport, ProjectExporter};
pub use repository::{CitationRepository, NoteRepository, ProjectRepository};
