//! Chat transport port
//!
//! Defines how the application layer opens a streaming chat request.
//! The transport only delivers raw body bytes; decoding the event stream is
//! the client's job so that any adapter (HTTP, test double) shares one parser.

use async_trait::async_trait;
use futures::stream::BoxStream;
use ragdesk_domain::ChatMode;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while opening or reading a chat stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Response has no body")]
    MissingBody,

    #[error("Stream interrupted: {0}")]
    Stream(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

/// Body of a streaming chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub mode: ChatMode,
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, mode: ChatMode, session_id: Option<String>) -> Self {
        Self {
            message: message.into(),
            mode,
            session_id,
        }
    }
}

/// Response body as a stream of byte chunks, split wherever the network split them.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// Opens streaming chat requests against the backend.
///
/// Implementations must resolve only once a successful (2xx) response with a
/// body is available; status failures are reported as
/// [`TransportError::Status`] before any bytes are yielded.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, TransportError>;
}
