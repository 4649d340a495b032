//! ScholarSync API crate - axum HTTP server and route handlers.
//!
//! Provides the REST API for projects, notes, citations, Markdown export,
//! and per-project chat sessions driven by the turn orchestrator.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
