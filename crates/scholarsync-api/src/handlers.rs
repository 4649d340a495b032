//! Route handler functions for all API endpoints.
//!
//! Each handler extracts path/query/body parameters via axum extractors,
//! calls the repositories or the turn orchestrator on AppState, and returns
//! JSON responses.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use scholarsync_chat::{ChatTurn, ProjectSnapshot, TurnOutcome};
use scholarsync_core::persona::{greeting, personas, AgentMode};
use scholarsync_core::types::{Citation, NewCitation, NewNote, NewProject, Note, NoteKind, Project};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

/// Request body for POST /api/notes.
#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub project_id: i64,
    pub title: String,
    pub content: String,
    /// Unknown or absent kinds are stored as `note`.
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: Option<String>,
}

/// Request body for POST /api/citations.
#[derive(Debug, Deserialize)]
pub struct CreateCitationRequest {
    pub project_id: i64,
    pub title: String,
    pub authors: String,
    pub year: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    /// Negative counts are stored as 0.
    #[serde(default, alias = "citationCount")]
    pub citation_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ChatParams {
    pub mode: Option<AgentMode>,
}

/// Request body for POST /api/projects/{id}/chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub mode: Option<AgentMode>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentInfo {
    pub mode: AgentMode,
    pub name: String,
    pub icon: String,
    pub instruction: String,
}

#[derive(Debug, Serialize)]
pub struct ChatSessionResponse {
    pub project_id: i64,
    pub mode: AgentMode,
    pub greeting: String,
    pub history: Vec<ChatTurn>,
    pub turn_in_flight: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<ProjectSnapshot>,
}

// =============================================================================
// Helpers
// =============================================================================

fn require_project(state: &AppState, id: i64) -> Result<Project, ApiError> {
    state
        .projects
        .find_by_id(id)?
        .ok_or_else(|| ApiError::NotFound(format!("project {} not found", id)))
}

// =============================================================================
// Health and agents
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        model: state.orchestrator.model_name().to_string(),
    })
}

/// GET /api/agents - the persona table.
pub async fn list_agents() -> Json<Vec<AgentInfo>> {
    Json(
        personas()
            .iter()
            .map(|p| AgentInfo {
                mode: p.mode,
                name: p.name.to_string(),
                icon: p.icon.to_string(),
                instruction: p.instruction.to_string(),
            })
            .collect(),
    )
}

// =============================================================================
// Projects
// =============================================================================

/// GET /api/projects - all projects, newest first.
pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(state.projects.list()?))
}

/// POST /api/projects - create a project.
pub async fn create_project(
    State(state): State<AppState>,
    Json(body): Json<NewProject>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let id = state.projects.create(&body)?;
    tracing::info!(project_id = id, "Project created");
    Ok(Json(CreatedResponse { id }))
}

/// DELETE /api/projects/{id} - delete a project, its notes, citations, and
/// chat session.
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.projects.delete(id)?;
    if state.sessions.remove(id) {
        tracing::debug!(project_id = id, "Dropped chat session of deleted project");
    }
    tracing::info!(project_id = id, "Project deleted");
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/projects/{id}/export - Markdown download of a project.
pub async fn export_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let export = state
        .exporter
        .export(id)?
        .ok_or_else(|| ApiError::NotFound(format!("project {} not found", id)))?;

    let file_name = export.file_name.replace(['"', '\\'], "");
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .map_err(|e| ApiError::Internal(format!("invalid export file name: {}", e)))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/markdown; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.markdown,
    )
        .into_response())
}

// =============================================================================
// Notes
// =============================================================================

/// GET /api/projects/{id}/notes
pub async fn list_notes(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Note>>, ApiError> {
    require_project(&state, id)?;
    Ok(Json(state.notes.list_by_project(id)?))
}

/// POST /api/notes
pub async fn create_note(
    State(state): State<AppState>,
    Json(body): Json<CreateNoteRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let note = NewNote {
        title: body.title,
        content: body.content,
        kind: NoteKind::normalize(body.kind.as_deref()),
    };
    let id = state.notes.create(body.project_id, &note)?;
    Ok(Json(CreatedResponse { id }))
}

/// DELETE /api/notes/{id}
pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.notes.delete(id)?;
    Ok(Json(SuccessResponse { success: true }))
}

// =============================================================================
// Citations
// =============================================================================

/// GET /api/projects/{id}/citations
pub async fn list_citations(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Citation>>, ApiError> {
    require_project(&state, id)?;
    Ok(Json(state.citations.list_by_project(id)?))
}

/// POST /api/citations
pub async fn create_citation(
    State(state): State<AppState>,
    Json(body): Json<CreateCitationRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let citation_count = body
        .citation_count
        .map(|n| u32::try_from(n.max(0)).unwrap_or(u32::MAX))
        .unwrap_or(0);
    let citation = NewCitation {
        title: body.title,
        authors: body.authors,
        year: body.year,
        url: body.url.unwrap_or_default(),
        doi: body.doi.unwrap_or_default(),
        abstract_text: body.abstract_text.unwrap_or_default(),
        citation_count,
    };
    let id = state.citations.create(body.project_id, &citation)?;
    Ok(Json(CreatedResponse { id }))
}

/// DELETE /api/citations/{id}
pub async fn delete_citation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.citations.delete(id)?;
    Ok(Json(SuccessResponse { success: true }))
}

// =============================================================================
// Chat
// =============================================================================

/// GET /api/projects/{id}/chat - open (or resume) the project's chat session.
///
/// The greeting is presentation only and is not part of the history.
pub async fn open_chat(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<ChatParams>,
) -> Result<Json<ChatSessionResponse>, ApiError> {
    let project = require_project(&state, id)?;
    let mode = params
        .mode
        .unwrap_or(state.config.chat.default_agent_mode);
    let session = state.sessions.get_or_create(id);

    Ok(Json(ChatSessionResponse {
        project_id: id,
        mode,
        greeting: greeting(&project.title, mode),
        history: session.history(),
        turn_in_flight: session.is_turn_in_flight(),
        snapshot: session.snapshot(),
    }))
}

/// POST /api/projects/{id}/chat - submit one chat turn.
///
/// The turn runs on its own task so a dropped connection cannot cancel tool
/// calls that are already dispatched.
pub async fn submit_chat(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError::BadRequest("'message' must not be empty".to_string()));
    }
    let project = require_project(&state, id)?;
    let mode = body.mode.unwrap_or(state.config.chat.default_agent_mode);
    let session = state.sessions.get_or_create(id);
    let orchestrator = Arc::clone(&state.orchestrator);

    let handle = tokio::spawn(async move {
        orchestrator
            .submit_turn(&session, Some(&project), mode, &body.message)
            .await
    });

    let outcome = handle
        .await
        .map_err(|e| ApiError::Internal(format!("chat turn task failed: {}", e)))??;

    outcome
        .map(Json)
        .ok_or_else(|| ApiError::BadRequest("'message' must not be empty".to_string()))
}

/// DELETE /api/projects/{id}/chat - forget the project's conversation.
///
/// Refused with 409 while a turn is running.
pub async fn clear_chat(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if let Some(session) = state.sessions.get(id) {
        session.try_clear()?;
    }
    Ok(Json(SuccessResponse { success: true }))
}
