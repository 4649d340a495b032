//! Application state shared across all route handlers.
//!
//! AppState holds references to all services and shared resources.
//! It is passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use scholarsync_chat::{ModelClient, SessionRegistry, SqliteResearchStore, TurnOrchestrator};
use scholarsync_core::config::ScholarConfig;
use scholarsync_storage::{
    CitationRepository, Database, NoteRepository, ProjectExporter, ProjectRepository,
};

/// Shared application state.
///
/// All fields use `Arc` (directly or inside the repositories) for cheap
/// cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<ScholarConfig>,
    /// SQLite database for persistent storage.
    pub database: Arc<Database>,
    pub projects: ProjectRepository,
    pub notes: NoteRepository,
    pub citations: CitationRepository,
    pub exporter: ProjectExporter,
    /// Open chat sessions, one per project.
    pub sessions: Arc<SessionRegistry>,
    pub orchestrator: Arc<TurnOrchestrator>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState from the configuration, an opened database,
    /// and the model client chat turns are sent to.
    pub fn new(config: ScholarConfig, database: Database, model: Arc<dyn ModelClient>) -> Self {
        let database = Arc::new(database);
        let store = Arc::new(SqliteResearchStore::new(Arc::clone(&database)));
        let orchestrator =
            TurnOrchestrator::new(model, store, &config.chat, config.model.search_grounding);

        Self {
            projects: ProjectRepository::new(Arc::clone(&database)),
            notes: NoteRepository::new(Arc::clone(&database)),
            citations: CitationRepository::new(Arc::clone(&database)),
            exporter: ProjectExporter::new(Arc::clone(&database)),
            sessions: Arc::new(SessionRegistry::new()),
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
            database,
            start_time: Instant::now(),
        }
    }
}
