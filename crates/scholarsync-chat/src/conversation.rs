//! In-memory conversation history for one chat session.

use serde::{Deserialize, Serialize};

/// Who authored a chat turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// Ordered, append-only sequence of chat turns. Not persisted.
#[derive(Clone, Debug, Default)]
pub struct ConversationStore {
    turns: Vec<ChatTurn>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut store = ConversationStore::new();
        assert!(store.is_empty());
        store.append(ChatTurn::user("hello"));
        store.append(ChatTurn::assistant("hi"));
        store.append(ChatTurn::user("find papers"));

        assert_eq!(store.len(), 3);
        let roles: Vec<ChatRole> = store.turns().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::User, ChatRole::Assistant, ChatRole::User]
        );
        assert_eq!(store.turns()[2].text, "find papers");
    }

    #[test]
    fn test_clear() {
        let mut store = ConversationStore::new();
        store.append(ChatTurn::user("hello"));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_chat_turn_serde() {
        let json = serde_json::to_value(ChatTurn::assistant("ok")).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["text"], "ok");
    }
}
