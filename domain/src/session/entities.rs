//! Conversation entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Text shown in place of an assistant reply that was cancelled before any
/// token arrived.
pub const CANCELLED_MARKER: &str = "[Response cancelled]";

/// Role of a turn in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("Invalid Role: {}", s)),
        }
    }
}

/// Client-generated identifier of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(Uuid);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One message (user or assistant) in a conversation (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    id: TurnId,
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
    is_streaming: bool,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: TurnId::new(),
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
            is_streaming: false,
        }
    }

    /// Empty assistant turn waiting for tokens.
    pub fn assistant_placeholder() -> Self {
        Self {
            id: TurnId::new(),
            role: Role::Assistant,
            content: String::new(),
            created_at: Utc::now(),
            is_streaming: true,
        }
    }

    /// A finished turn restored from the backend's session history.
    pub fn restored(role: Role, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: TurnId::new(),
            role,
            content: content.into(),
            created_at,
            is_streaming: false,
        }
    }

    pub fn id(&self) -> TurnId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }
}

/// Ordered sequence of turns for one conversation.
///
/// Append-only, except that the single streaming assistant turn may have its
/// content extended and then be finalized exactly once.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The assistant turn still receiving tokens, if any.
    pub fn streaming_turn(&self) -> Option<&ConversationTurn> {
        self.turns.iter().find(|t| t.is_streaming)
    }

    pub fn get(&self, id: TurnId) -> Option<&ConversationTurn> {
        self.turns.iter().find(|t| t.id == id)
    }

    /// Append a user turn and a streaming assistant placeholder.
    ///
    /// Returns the placeholder's id, or `None` (leaving the sequence untouched)
    /// when another assistant turn is still streaming.
    pub fn begin_exchange(&mut self, content: impl Into<String>) -> Option<TurnId> {
        if self.streaming_turn().is_some() {
            return None;
        }
        let placeholder = ConversationTurn::assistant_placeholder();
        let id = placeholder.id;
        self.turns.push(ConversationTurn::user(content));
        self.turns.push(placeholder);
        Some(id)
    }

    /// Append a finished turn (used when resuming a stored session).
    pub fn push_restored(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// Append a token to the streaming turn. Returns false if `id` is not
    /// the streaming turn.
    pub fn append_token(&mut self, id: TurnId, chunk: &str) -> bool {
        match self.streaming_mut(id) {
            Some(turn) => {
                turn.content.push_str(chunk);
                true
            }
            None => false,
        }
    }

    /// Freeze the streaming turn with the text received so far.
    pub fn complete(&mut self, id: TurnId) -> Option<&ConversationTurn> {
        let turn = self.streaming_mut(id)?;
        turn.is_streaming = false;
        Some(turn)
    }

    /// Replace the streaming turn's content with a user-facing error message.
    pub fn fail(&mut self, id: TurnId, message: &str) -> Option<&ConversationTurn> {
        let turn = self.streaming_mut(id)?;
        turn.content = format!("Sorry, an error occurred: {}", message);
        turn.is_streaming = false;
        Some(turn)
    }

    /// Keep partial content; mark the turn cancelled if nothing arrived.
    pub fn cancel(&mut self, id: TurnId) -> Option<&ConversationTurn> {
        let turn = self.streaming_mut(id)?;
        if turn.content.is_empty() {
            turn.content = CANCELLED_MARKER.to_string();
        }
        turn.is_streaming = false;
        Some(turn)
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    fn streaming_mut(&mut self, id: TurnId) -> Option<&mut ConversationTurn> {
        self.turns
            .iter_mut()
            .find(|t| t.id == id && t.is_streaming)
    }
}
