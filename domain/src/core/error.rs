//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid chat mode '{0}'. Must be one of: strategy_qa, actions, analytics, regulatory")]
    InvalidMode(String),

    #[error("Invalid JSON in stream record: {error}\nRaw line: {raw}")]
    InvalidJson { error: String, raw: String },

    #[error("Stream record is not a JSON object: {0}")]
    NotAnObject(String),

    #[error("Stream line is not valid UTF-8")]
    InvalidUtf8,
}
