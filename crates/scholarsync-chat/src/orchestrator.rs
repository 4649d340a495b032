//! Turn orchestrator: sends a chat turn to the model, executes the tool calls
//! it emits against persistence, and produces the final reply.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use scholarsync_core::config::ChatConfig;
use scholarsync_core::persona::AgentMode;
use scholarsync_core::types::Project;

use crate::context::{ProjectContextBuilder, ProjectSnapshot};
use crate::conversation::{ChatRole, ChatTurn};
use crate::error::ChatError;
use crate::model::{ModelClient, ModelContent, ModelRequest, ModelRole};
use crate::session::ChatSession;
use crate::state_machine::{TurnState, TurnTracker};
use crate::store::ResearchStore;
use crate::tools::{coerce, RawToolCall, ToolCommand, ToolRegistry, ValidationAnomaly};

/// Reply when tools ran but the model said nothing.
pub const SAVED_REPLY: &str = "I've saved that information to your project.";
/// Reply when the model produced neither text nor a successful tool call.
pub const EMPTY_REPLY: &str = "I'm sorry, I couldn't generate a response.";
/// Reply when the model service could not be reached.
pub const TRANSPORT_FAILURE_REPLY: &str = "Error: Failed to reach the assistant service.";

const TOOL_GUIDANCE: &str = "When you find a relevant paper or want to save a note/draft, \
use the provided tools to save them to the project database.";

// =============================================================================
// Outcome types
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Saved,
    Failed,
    Ignored,
}

/// Result of one tool call, in emitted order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolOutcome {
    pub tool: String,
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<i64>,
}

/// A non-fatal problem observed during a turn.
#[derive(Clone, Debug, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnAnomaly {
    #[error("invalid tool call: {0}")]
    Validation(ValidationAnomaly),
    #[error("{tool} failed to persist: {message}")]
    PersistenceFailure { tool: String, message: String },
    #[error("unknown tool ignored: {name}")]
    UnknownTool { name: String },
    #[error("model service unreachable: {message}")]
    TransportFailure { message: String },
    #[error("project context unavailable: {message}")]
    ContextUnavailable { message: String },
    #[error("project refresh failed: {message}")]
    RefreshFailed { message: String },
}

/// Everything a caller learns about a completed turn.
#[derive(Clone, Debug, Serialize)]
pub struct TurnOutcome {
    pub turn_id: Uuid,
    pub state: TurnState,
    pub reply: String,
    pub tool_outcomes: Vec<ToolOutcome>,
    pub anomalies: Vec<TurnAnomaly>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<ProjectSnapshot>,
}

impl TurnOutcome {
    pub fn saved_count(&self) -> usize {
        self.tool_outcomes
            .iter()
            .filter(|o| o.status == ToolStatus::Saved)
            .count()
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Drives one chat turn from user text to final reply.
pub struct TurnOrchestrator {
    model: Arc<dyn ModelClient>,
    store: Arc<dyn ResearchStore>,
    tools: ToolRegistry,
    context: ProjectContextBuilder,
    search_grounding: bool,
    max_message_length: usize,
}

impl TurnOrchestrator {
    pub fn new(
        model: Arc<dyn ModelClient>,
        store: Arc<dyn ResearchStore>,
        config: &ChatConfig,
        search_grounding: bool,
    ) -> Self {
        Self {
            model,
            store,
            tools: ToolRegistry::new(),
            context: ProjectContextBuilder::from_config(config),
            search_grounding,
            max_message_length: config.max_message_length,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Run one turn.
    ///
    /// Returns `Ok(None)` without doing anything if no project is active or
    /// the text is blank. Model and tool failures are reported in the
    /// outcome; errors are reserved for turns that cannot start.
    pub async fn submit_turn(
        &self,
        session: &ChatSession,
        project: Option<&Project>,
        mode: AgentMode,
        user_text: &str,
    ) -> Result<Option<TurnOutcome>, ChatError> {
        let Some(project) = project else {
            return Ok(None);
        };
        if user_text.trim().is_empty() {
            return Ok(None);
        }
        if session.project_id() != project.id {
            return Err(ChatError::SessionMismatch {
                session: session.project_id(),
                project: project.id,
            });
        }
        if user_text.chars().count() > self.max_message_length {
            return Err(ChatError::MessageTooLong(self.max_message_length));
        }

        let _permit = session.try_begin_turn()?;
        let turn_id = Uuid::new_v4();
        let span = info_span!("turn", %turn_id, project_id = project.id, mode = %mode);

        self.run_turn(session, project, mode, user_text, turn_id)
            .instrument(span)
            .await
            .map(Some)
    }

    async fn run_turn(
        &self,
        session: &ChatSession,
        project: &Project,
        mode: AgentMode,
        user_text: &str,
        turn_id: Uuid,
    ) -> Result<TurnOutcome, ChatError> {
        let mut tracker = TurnTracker::new();
        let mut anomalies = Vec::new();

        let request = self.compose(session, project, mode, user_text, &mut anomalies);

        tracker.advance(TurnState::AwaitingModel)?;
        let response = match self.model.generate(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(model = self.model.name(), error = %e, "Model request failed");
                tracker.advance(TurnState::Failed)?;
                anomalies.push(TurnAnomaly::TransportFailure {
                    message: e.to_string(),
                });
                session.append(ChatTurn::user(user_text));
                session.append(ChatTurn::assistant(TRANSPORT_FAILURE_REPLY));
                return Ok(TurnOutcome {
                    turn_id,
                    state: tracker.state(),
                    reply: TRANSPORT_FAILURE_REPLY.to_string(),
                    tool_outcomes: Vec::new(),
                    anomalies,
                    snapshot: None,
                });
            }
        };

        let mut tool_outcomes = Vec::with_capacity(response.tool_calls.len());
        let mut snapshot = None;
        if !response.tool_calls.is_empty() {
            tracker.advance(TurnState::ExecutingTools)?;
            for call in &response.tool_calls {
                let outcome = self.execute(project.id, call, &mut anomalies);
                tool_outcomes.push(outcome);
            }
            if tool_outcomes.iter().any(|o| o.status == ToolStatus::Saved) {
                snapshot = self.refresh(session, project.id, &mut anomalies);
            }
        }

        tracker.advance(TurnState::Finalizing)?;
        let any_saved = tool_outcomes.iter().any(|o| o.status == ToolStatus::Saved);
        let reply = match response.text {
            Some(text) if !text.trim().is_empty() => text,
            _ if any_saved => SAVED_REPLY.to_string(),
            _ => EMPTY_REPLY.to_string(),
        };

        session.append(ChatTurn::user(user_text));
        session.append(ChatTurn::assistant(reply.clone()));
        tracker.advance(TurnState::Done)?;

        info!(
            tools = tool_outcomes.len(),
            saved = tool_outcomes
                .iter()
                .filter(|o| o.status == ToolStatus::Saved)
                .count(),
            anomalies = anomalies.len(),
            "Turn complete"
        );

        Ok(TurnOutcome {
            turn_id,
            state: tracker.state(),
            reply,
            tool_outcomes,
            anomalies,
            snapshot,
        })
    }

    /// Build the outbound request: prior history, the new user turn, and the
    /// persona instruction with the project context appended.
    fn compose(
        &self,
        session: &ChatSession,
        project: &Project,
        mode: AgentMode,
        user_text: &str,
        anomalies: &mut Vec<TurnAnomaly>,
    ) -> ModelRequest {
        let notes = self.load_section(self.store.list_notes(project.id), anomalies);
        let citations = self.load_section(self.store.list_citations(project.id), anomalies);
        let context = self
            .context
            .build(project, notes.as_deref(), citations.as_deref());

        let mut contents: Vec<ModelContent> = session
            .history()
            .into_iter()
            .map(|turn| ModelContent {
                role: match turn.role {
                    ChatRole::User => ModelRole::User,
                    ChatRole::Assistant => ModelRole::Model,
                },
                text: turn.text,
            })
            .collect();
        contents.push(ModelContent {
            role: ModelRole::User,
            text: user_text.to_string(),
        });

        let system_instruction = format!(
            "{}\n\nPROJECT CONTEXT:\n{}\n\n{}",
            mode.persona().instruction,
            context,
            TOOL_GUIDANCE
        );
        debug!(contents = contents.len(), "Composed model request");

        ModelRequest {
            contents,
            system_instruction,
            tools: self.tools.declarations().to_vec(),
            search_grounding: self.search_grounding,
        }
    }

    fn load_section<T>(
        &self,
        result: scholarsync_core::Result<Vec<T>>,
        anomalies: &mut Vec<TurnAnomaly>,
    ) -> Option<Vec<T>> {
        match result {
            Ok(items) => Some(items),
            Err(e) => {
                warn!(error = %e, "Could not load project data for context");
                anomalies.push(TurnAnomaly::ContextUnavailable {
                    message: e.to_string(),
                });
                None
            }
        }
    }

    /// Execute one tool call scoped to `project_id`. Never aborts the turn.
    fn execute(
        &self,
        project_id: i64,
        call: &RawToolCall,
        anomalies: &mut Vec<TurnAnomaly>,
    ) -> ToolOutcome {
        let outcome = |status, record_id| ToolOutcome {
            tool: call.name.clone(),
            status,
            record_id,
        };

        let command = match coerce(call) {
            Ok(command) => command,
            Err(anomaly) => {
                warn!(tool = %call.name, error = %anomaly, "Rejected tool call");
                anomalies.push(TurnAnomaly::Validation(anomaly));
                return outcome(ToolStatus::Failed, None);
            }
        };

        let result = match &command {
            ToolCommand::SaveNote(note) => self.store.create_note(project_id, note),
            ToolCommand::SaveCitation(citation) => {
                self.store.create_citation(project_id, citation)
            }
            ToolCommand::Unknown { name } => {
                warn!(tool = %name, "Ignoring unknown tool call");
                anomalies.push(TurnAnomaly::UnknownTool { name: name.clone() });
                return outcome(ToolStatus::Ignored, None);
            }
        };

        match result {
            Ok(id) => {
                debug!(tool = %call.name, id, "Tool call saved");
                outcome(ToolStatus::Saved, Some(id))
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call failed");
                anomalies.push(TurnAnomaly::PersistenceFailure {
                    tool: call.name.clone(),
                    message: e.to_string(),
                });
                outcome(ToolStatus::Failed, None)
            }
        }
    }

    /// Re-list the project's data and update the session's cached view.
    fn refresh(
        &self,
        session: &ChatSession,
        project_id: i64,
        anomalies: &mut Vec<TurnAnomaly>,
    ) -> Option<ProjectSnapshot> {
        let loaded = self
            .store
            .list_notes(project_id)
            .and_then(|notes| Ok((notes, self.store.list_citations(project_id)?)));
        match loaded {
            Ok((notes, citations)) => {
                let snapshot = ProjectSnapshot {
                    project_id,
                    notes,
                    citations,
                    refreshed_at: Utc::now(),
                };
                session.set_snapshot(snapshot.clone());
                Some(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "Failed to refresh project view");
                anomalies.push(TurnAnomaly::RefreshFailed {
                    message: e.to_string(),
                });
                None
            }
        }
    }
}
