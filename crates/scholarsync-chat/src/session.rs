//! Chat sessions: one per project, admitting a single turn at a time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::context::ProjectSnapshot;
use crate::conversation::{ChatTurn, ConversationStore};
use crate::error::ChatError;

/// Conversation state and cached project view for one project.
#[derive(Debug)]
pub struct ChatSession {
    project_id: i64,
    conversation: Mutex<ConversationStore>,
    snapshot: Mutex<Option<ProjectSnapshot>>,
    in_flight: AtomicBool,
}

/// Held for the duration of a turn; releases the session on drop.
#[derive(Debug)]
pub struct TurnPermit<'a> {
    session: &'a ChatSession,
}

impl Drop for TurnPermit<'_> {
    fn drop(&mut self) {
        self.session.in_flight.store(false, Ordering::Release);
    }
}

// Session state stays usable even if a holder panicked mid-update.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl ChatSession {
    pub fn new(project_id: i64) -> Self {
        Self {
            project_id,
            conversation: Mutex::new(ConversationStore::new()),
            snapshot: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn project_id(&self) -> i64 {
        self.project_id
    }

    /// Claim the session for a turn, or fail if another turn holds it.
    pub fn try_begin_turn(&self) -> Result<TurnPermit<'_>, ChatError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ChatError::TurnInFlight(self.project_id))?;
        Ok(TurnPermit { session: self })
    }

    pub fn is_turn_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn history(&self) -> Vec<ChatTurn> {
        lock(&self.conversation).turns().to_vec()
    }

    pub fn history_len(&self) -> usize {
        lock(&self.conversation).len()
    }

    pub fn append(&self, turn: ChatTurn) {
        lock(&self.conversation).append(turn);
    }

    pub fn snapshot(&self) -> Option<ProjectSnapshot> {
        lock(&self.snapshot).clone()
    }

    pub fn set_snapshot(&self, snapshot: ProjectSnapshot) {
        *lock(&self.snapshot) = Some(snapshot);
    }

    /// Forget the conversation and cached view.
    pub fn clear(&self) {
        lock(&self.conversation).clear();
        *lock(&self.snapshot) = None;
    }

    /// Clear the session unless a turn is running. The session stays
    /// registered, so a later turn still goes through the same guard.
    pub fn try_clear(&self) -> Result<(), ChatError> {
        let _permit = self.try_begin_turn()?;
        self.clear();
        Ok(())
    }
}

/// All open sessions, keyed by project id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<i64, Arc<ChatSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, project_id: i64) -> Arc<ChatSession> {
        let mut sessions = lock(&self.sessions);
        Arc::clone(
            sessions
                .entry(project_id)
                .or_insert_with(|| Arc::new(ChatSession::new(project_id))),
        )
    }

    pub fn get(&self, project_id: i64) -> Option<Arc<ChatSession>> {
        lock(&self.sessions).get(&project_id).cloned()
    }

    /// Drop a project's session. Returns whether one existed.
    pub fn remove(&self, project_id: i64) -> bool {
        lock(&self.sessions).remove(&project_id).is_some()
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
