//! Chat observer port
//!
//! Callbacks through which the UI layer follows a streaming exchange.
//! Every method has a no-op default so implementations only override what
//! they render.

use crate::error::ChatError;
use ragdesk_domain::ConversationTurn;
use serde_json::Value;

/// Receives live updates from [`StreamingChatClient`](crate::StreamingChatClient).
///
/// Callbacks are invoked after the client has released its internal lock, so
/// implementations may read client snapshots from inside a callback.
pub trait ChatObserver: Send + Sync {
    /// A user turn and its assistant placeholder were appended.
    fn on_exchange_started(&self, _user_turn: &ConversationTurn) {}

    /// The stream-start record arrived.
    fn on_stream_start(&self, _session_id: Option<&str>, _sources: &[String]) {}

    /// A token was appended to the streaming turn.
    fn on_token(&self, _chunk: &str) {}

    /// The stream-end record carried an analytics payload.
    fn on_analytics(&self, _analytics: &Value) {}

    /// The assistant turn finished normally.
    fn on_complete(&self, _turn: &ConversationTurn) {}

    /// The exchange failed. Not called on cancellation.
    fn on_error(&self, _error: &ChatError) {}

    /// The exchange was cancelled via `abort_stream`.
    fn on_cancelled(&self, _turn: Option<&ConversationTurn>) {}
}

/// No-op observer for when nothing renders the conversation
pub struct NoChatObserver;

impl ChatObserver for NoChatObserver {}
