//! Chat layer for ScholarSync.
//!
//! Holds per-project conversation sessions, builds the project context sent
//! to the model, declares the tools the model may call, and runs the
//! tool-calling turn loop against persistence.

pub mod context;
pub mod conversation;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod session;
pub mod state_machine;
pub mod store;
pub mod tools;

pub use context::{ProjectContextBuilder, ProjectSnapshot};
pub use conversation::{ChatRole, ChatTurn, ConversationStore};
pub use error::{ChatError, ModelError};
pub use model::{
    DisabledModelClient, GeminiClient, ModelClient, ModelContent, ModelRequest, ModelResponse,
    ModelRole,
};
pub use orchestrator::{ToolOutcome, ToolStatus, TurnAnomaly, TurnOrchestrator, TurnOutcome};
pub use session::{ChatSession, SessionRegistry, TurnPermit};
pub use state_machine::{validate_transition, TurnState};
pub use store::{ResearchStore, SqliteResearchStore};
pub use tools::{coerce, RawToolCall, ToolCommand, ToolDeclaration, ToolRegistry, ValidationAnomaly};
