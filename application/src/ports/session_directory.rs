//! Session directory port
//!
//! Read and delete access to conversations the backend has stored, so a
//! client can list past sessions and resume one.

use crate::ports::chat_transport::TransportError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use ragdesk_domain::{ConversationTurn, Role};
use serde::Deserialize;

/// One stored conversation as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: Option<String>,
    pub mode: String,
    pub created_at: String,
    #[serde(default)]
    pub message_count: u64,
}

/// A page of sessions plus the total the backend holds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionPage {
    pub sessions: Vec<SessionSummary>,
    pub total: u64,
}

/// A stored message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

impl StoredMessage {
    /// Convert into a finished turn. Messages with roles the client does not
    /// display (e.g. `system`) yield `None`.
    pub fn to_turn(&self) -> Option<ConversationTurn> {
        let role: Role = self.role.parse().ok()?;
        Some(ConversationTurn::restored(
            role,
            self.content.clone(),
            parse_timestamp(&self.created_at),
        ))
    }
}

/// Full history of one session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionHistory {
    pub session_id: String,
    pub title: Option<String>,
    pub mode: String,
    pub messages: Vec<StoredMessage>,
}

impl SessionHistory {
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.messages
            .iter()
            .filter_map(StoredMessage::to_turn)
            .collect()
    }
}

/// The backend writes ISO-8601 timestamps, with or without an offset.
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Access to stored sessions
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    async fn list_sessions(&self, limit: u32, offset: u32) -> Result<SessionPage, TransportError>;

    async fn session_history(&self, session_id: &str) -> Result<SessionHistory, TransportError>;

    async fn delete_session(&self, session_id: &str) -> Result<(), TransportError>;
}
