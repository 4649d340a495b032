//! Error types for the chat layer.

use crate::state_machine::TurnState;

/// Errors from the chat engine.
///
/// Per-turn failures (model unreachable, a tool call rejected) are reported
/// in the turn outcome instead; these are the errors that stop a turn from
/// being attempted at all.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("a turn is already in flight for project {0}")]
    TurnInFlight(i64),
    #[error("session belongs to project {session}, not project {project}")]
    SessionMismatch { session: i64, project: i64 },
    #[error("invalid turn transition: {0} -> {1}")]
    InvalidTransition(TurnState, TurnState),
}

/// Errors from a language-model round trip.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model client is not configured: {0}")]
    NotConfigured(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("model service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        ModelError::Transport(err.to_string())
    }
}
