//! reqwest-backed chat transport.
//!
//! Sends the chat request as JSON and hands the response body back as a
//! stream of raw byte chunks. Event-stream decoding happens in the client.

use super::error::{HttpSetupError, connection_error, status_message};
use crate::auth::AuthSession;
use crate::config::FileServerConfig;
use async_trait::async_trait;
use futures::StreamExt;
use ragdesk_application::{ByteStream, ChatRequest, ChatTransport, TransportError};
use reqwest::header::ACCEPT;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Opens `POST {base_url}{stream_path}` requests.
pub struct HttpChatTransport {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    timeout: Duration,
    auth: Arc<AuthSession>,
}

impl HttpChatTransport {
    pub fn new(config: &FileServerConfig, auth: Arc<AuthSession>) -> Result<Self, HttpSetupError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder().connect_timeout(timeout).build()?;
        Self::with_client(client, config, auth)
    }

    /// Use a preconfigured client (proxy settings, TLS roots, tests).
    pub fn with_client(
        client: reqwest::Client,
        config: &FileServerConfig,
        auth: Arc<AuthSession>,
    ) -> Result<Self, HttpSetupError> {
        let url = config.stream_url();
        let endpoint = reqwest::Url::parse(&url).map_err(|e| HttpSetupError::InvalidUrl {
            url,
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            endpoint,
            timeout: Duration::from_secs(config.timeout_secs),
            auth,
        })
    }

    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        debug!("POST {}", self.endpoint);

        let builder = self
            .auth
            .apply(self.client.post(self.endpoint.clone()))
            .header(ACCEPT, "text/event-stream")
            .json(request);

        // Only the wait for headers is bounded; answers may stream for minutes
        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(connection_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = status_message(status, &body);
            warn!("Chat request rejected: HTTP {} ({})", status.as_u16(), message);
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        if response.content_length() == Some(0) {
            return Err(TransportError::MissingBody);
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| TransportError::Stream(e.to_string()))
            })
            .boxed())
    }
}
