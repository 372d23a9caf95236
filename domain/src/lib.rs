//! Domain layer for ragdesk
//!
//! This crate contains the conversation entities, the chat stream protocol
//! and the value objects shared by every other layer. It has no dependencies
//! on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Conversation
//!
//! A [`Conversation`] is an append-only list of [`ConversationTurn`]s. Every
//! send appends a user turn plus an assistant placeholder that grows while
//! the response streams in. At most one turn streams at a time.
//!
//! ## Chat stream protocol
//!
//! Responses arrive as `text/event-stream`. [`SseDecoder`] turns arbitrary
//! byte chunks into [`SseRecord`]s and [`ChatEvent::classify`] maps each
//! record onto one of start / token / done / error.

pub mod core;
pub mod session;
pub mod util;

// Re-export commonly used types
pub use core::{error::DomainError, mode::ChatMode};
pub use session::{
    decoder::{SseDecoder, SseRecord},
    entities::{CANCELLED_MARKER, Conversation, ConversationTurn, Role, TurnId},
    state::{SessionIdUpdate, StreamSession},
    stream::ChatEvent,
};
