//! Turn state machine with validated transitions.
//!
//! Composing -> AwaitingModel -> (ExecutingTools) -> Finalizing -> Done
//! Any non-terminal state -> Failed

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Lifecycle state of a single chat turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Composing,
    AwaitingModel,
    ExecutingTools,
    Finalizing,
    Done,
    Failed,
}

impl TurnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::Composing => "composing",
            TurnState::AwaitingModel => "awaiting_model",
            TurnState::ExecutingTools => "executing_tools",
            TurnState::Finalizing => "finalizing",
            TurnState::Done => "done",
            TurnState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Done | TurnState::Failed)
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate that a turn state transition is allowed.
///
/// Valid transitions:
/// - Composing -> AwaitingModel
/// - AwaitingModel -> ExecutingTools
/// - AwaitingModel -> Finalizing (no tool calls)
/// - ExecutingTools -> Finalizing
/// - Finalizing -> Done
/// - any non-terminal -> Failed
pub fn validate_transition(from: TurnState, to: TurnState) -> Result<(), ChatError> {
    let valid = matches!(
        (from, to),
        (TurnState::Composing, TurnState::AwaitingModel)
            | (TurnState::AwaitingModel, TurnState::ExecutingTools)
            | (TurnState::AwaitingModel, TurnState::Finalizing)
            | (TurnState::ExecutingTools, TurnState::Finalizing)
            | (TurnState::Finalizing, TurnState::Done)
    ) || (to == TurnState::Failed && !from.is_terminal());

    if valid {
        Ok(())
    } else {
        Err(ChatError::InvalidTransition(from, to))
    }
}

/// Tracks the current state of one turn, rejecting invalid moves.
#[derive(Debug)]
pub struct TurnTracker {
    state: TurnState,
}

impl TurnTracker {
    pub fn new() -> Self {
        Self {
            state: TurnState::Composing,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn advance(&mut self, to: TurnState) -> Result<(), ChatError> {
        validate_transition(self.state, to)?;
        tracing::trace!(from = %self.state, to = %to, "Turn transition");
        self.state = to;
        Ok(())
    }
}

impl Default for TurnTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TurnState; 6] = [
        TurnState::Composing,
        TurnState::AwaitingModel,
        TurnState::ExecutingTools,
        TurnState::Finalizing,
        TurnState::Done,
        TurnState::Failed,
    ];

    // =====================================================================
    // Valid transitions
    // =====================================================================

    #[test]
    fn test_composing_to_awaiting_model() {
        assert!(validate_transition(TurnState::Composing, TurnState::AwaitingModel).is_ok());
    }

    #[test]
    fn test_awaiting_model_to_executing_tools() {
        assert!(validate_transition(TurnState::AwaitingModel, TurnState::ExecutingTools).is_ok());
    }

    #[test]
    fn test_awaiting_model_to_finalizing() {
        assert!(validate_transition(TurnState::AwaitingModel, TurnState::Finalizing).is_ok());
    }

    #[test]
    fn test_executing_tools_to_finalizing() {
        assert!(validate_transition(TurnState::ExecutingTools, TurnState::Finalizing).is_ok());
    }

    #[test]
    fn test_finalizing_to_done() {
        assert!(validate_transition(TurnState::Finalizing, TurnState::Done).is_ok());
    }

    #[test]
    fn test_every_non_terminal_state_can_fail() {
        for from in ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(validate_transition(*from, TurnState::Failed).is_ok(), "{}", from);
        }
    }

    // =====================================================================
    // Invalid transitions
    // =====================================================================

    #[test]
    fn test_terminal_states_are_final() {
        for from in [TurnState::Done, TurnState::Failed] {
            for to in ALL {
                assert!(validate_transition(from, to).is_err(), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_composing_cannot_skip_model() {
        assert!(validate_transition(TurnState::Composing, TurnState::ExecutingTools).is_err());
        assert!(validate_transition(TurnState::Composing, TurnState::Done).is_err());
    }

    #[test]
    fn test_no_self_transitions() {
        for s in ALL {
            assert!(validate_transition(s, s).is_err(), "{}", s);
        }
    }

    #[test]
    fn test_cannot_go_backwards() {
        assert!(validate_transition(TurnState::Finalizing, TurnState::AwaitingModel).is_err());
        assert!(validate_transition(TurnState::ExecutingTools, TurnState::AwaitingModel).is_err());
    }

    #[test]
    fn test_invalid_transition_error_carries_states() {
        let err = validate_transition(TurnState::Done, TurnState::Finalizing).unwrap_err();
        assert!(matches!(
            err,
            ChatError::InvalidTransition(TurnState::Done, TurnState::Finalizing)
        ));
    }

    // =====================================================================
    // Tracker
    // =====================================================================

    #[test]
    fn test_tracker_happy_path() {
        let mut t = TurnTracker::new();
        assert_eq!(t.state(), TurnState::Composing);
        t.advance(TurnState::AwaitingModel).unwrap();
        t.advance(TurnState::ExecutingTools).unwrap();
        t.advance(TurnState::Finalizing).unwrap();
        t.advance(TurnState::Done).unwrap();
        assert_eq!(t.state(), TurnState::Done);
    }

    #[test]
    fn test_tracker_rejects_invalid_and_keeps_state() {
        let mut t = TurnTracker::new();
        assert!(t.advance(TurnState::Done).is_err());
        assert_eq!(t.state(), TurnState::Composing);
    }

    #[test]
    fn test_turn_state_serde() {
        let json = serde_json::to_string(&TurnState::AwaitingModel).unwrap();
        assert_eq!(json, "\"awaiting_model\"");
    }
}
