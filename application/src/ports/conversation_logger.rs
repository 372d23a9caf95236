//! Port for structured conversation logging.
//!
//! Defines the [`ConversationLogger`] trait for recording finished exchanges
//! (question, answer, outcome, session id, citations) to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! diagnostic messages, while this port keeps a machine-readable transcript.

use serde_json::Value;

/// A structured conversation event for logging.
pub struct ConversationEvent {
    /// Event type identifier (e.g. "exchange_completed", "exchange_failed").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging conversation events to a structured log.
///
/// `log` is synchronous and infallible; implementations swallow their own
/// I/O errors so a broken log never interrupts a chat.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
