//! Chat session domain.
//!
//! - [`entities::Conversation`]: ordered turns of one conversation
//! - [`entities::ConversationTurn`]: a single user or assistant message
//! - [`state::StreamSession`]: server session id, citations, analytics
//! - [`decoder::SseDecoder`]: incremental event-stream line decoder
//! - [`stream::ChatEvent`]: typed events and the wire classifier

pub mod decoder;
pub mod entities;
pub mod state;
pub mod stream;
