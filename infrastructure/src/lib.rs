//! Infrastructure layer for ragdesk
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the HTTP chat transport, the stored-session
//! client, the auth context they share, configuration file loading and the
//! JSONL conversation log.

pub mod auth;
pub mod config;
pub mod http;
pub mod logging;

// Re-export commonly used types
pub use auth::AuthSession;
pub use config::{
    ConfigIssue, ConfigLoader, FileAuthConfig, FileChatConfig, FileConfig, FileLoggingConfig,
    FileReplConfig, FileServerConfig, Severity,
};
pub use http::{HttpChatTransport, HttpSessionDirectory, HttpSetupError};
pub use logging::JsonlConversationLogger;
