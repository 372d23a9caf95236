//! Errors surfaced by the streaming chat client

use crate::ports::chat_transport::TransportError;
use ragdesk_domain::DomainError;
use thiserror::Error;

/// Errors that can end a chat exchange
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("A response is already streaming")]
    StreamInFlight,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] DomainError),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ChatError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChatError::Cancelled)
    }
}
