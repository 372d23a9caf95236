//! Application layer for ragdesk
//!
//! This crate contains the streaming chat client and the port definitions
//! its adapters implement. It depends only on the domain layer.

pub mod error;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use error::ChatError;
pub use ports::{
    chat_observer::{ChatObserver, NoChatObserver},
    chat_transport::{ByteStream, ChatRequest, ChatTransport, TransportError},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    session_directory::{
        SessionDirectory, SessionHistory, SessionPage, SessionSummary, StoredMessage,
    },
};
pub use use_cases::streaming_chat::{StreamOutcome, StreamingChatClient};
