//! reqwest-backed access to stored sessions.

use super::error::{HttpSetupError, connection_error, status_message};
use crate::auth::AuthSession;
use crate::config::FileServerConfig;
use async_trait::async_trait;
use ragdesk_application::{SessionDirectory, SessionHistory, SessionPage, TransportError};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Talks to `{base_url}{sessions_path}`.
pub struct HttpSessionDirectory {
    client: reqwest::Client,
    base: reqwest::Url,
    auth: Arc<AuthSession>,
}

impl HttpSessionDirectory {
    pub fn new(config: &FileServerConfig, auth: Arc<AuthSession>) -> Result<Self, HttpSetupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Self::with_client(client, config, auth)
    }

    pub fn with_client(
        client: reqwest::Client,
        config: &FileServerConfig,
        auth: Arc<AuthSession>,
    ) -> Result<Self, HttpSetupError> {
        let url = config.sessions_url();
        let base = reqwest::Url::parse(&url).map_err(|e| HttpSetupError::InvalidUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(HttpSetupError::InvalidUrl {
                url,
                reason: "cannot be a base URL".to_string(),
            });
        }
        Ok(Self { client, base, auth })
    }

    /// `{base}/{session_id}` with the id percent-encoded as one segment.
    fn session_url(&self, session_id: &str) -> reqwest::Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was ruled out in the constructor
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(session_id);
        }
        url
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, TransportError> {
        let response = self
            .auth
            .apply(request)
            .send()
            .await
            .map_err(connection_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            message: status_message(status, &body),
        })
    }

    async fn json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, TransportError> {
        let bytes = response.bytes().await.map_err(connection_error)?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl SessionDirectory for HttpSessionDirectory {
    async fn list_sessions(&self, limit: u32, offset: u32) -> Result<SessionPage, TransportError> {
        debug!("GET {} (limit={}, offset={})", self.base, limit, offset);
        let request = self
            .client
            .get(self.base.clone())
            .query(&[("limit", limit), ("offset", offset)]);
        Self::json(self.send(request).await?).await
    }

    async fn session_history(&self, session_id: &str) -> Result<SessionHistory, TransportError> {
        let url = self.session_url(session_id);
        debug!("GET {}", url);
        Self::json(self.send(self.client.get(url)).await?).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), TransportError> {
        let url = self.session_url(session_id);
        debug!("DELETE {}", url);
        self.send(self.client.delete(url)).await?;
        Ok(())
    }
}
