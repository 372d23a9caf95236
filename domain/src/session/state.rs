//! Per-conversation stream metadata.

use serde_json::Value;

/// Outcome of offering a server-assigned session id to [`StreamSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionIdUpdate {
    /// No id was held; the offered one is now current.
    Captured,
    /// The offered id matches the current one.
    Unchanged,
    /// A different id was offered and ignored; carries the rejected id.
    Conflicting(String),
}

/// Ephemeral metadata for the current backend conversation.
///
/// `sources` and `analytics` are replaced wholesale by each response that
/// carries them. The session id sticks once captured until [`reset`](Self::reset).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSession {
    session_id: Option<String>,
    sources: Vec<String>,
    analytics: Option<Value>,
}

impl StreamSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session resumed from a known backend id.
    pub fn resumed(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Default::default()
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn analytics(&self) -> Option<&Value> {
        self.analytics.as_ref()
    }

    pub fn offer_session_id(&mut self, session_id: &str) -> SessionIdUpdate {
        match &self.session_id {
            None => {
                self.session_id = Some(session_id.to_string());
                SessionIdUpdate::Captured
            }
            Some(current) if current == session_id => SessionIdUpdate::Unchanged,
            Some(_) => SessionIdUpdate::Conflicting(session_id.to_string()),
        }
    }

    pub fn replace_sources(&mut self, sources: Vec<String>) {
        self.sources = sources;
    }

    pub fn replace_analytics(&mut self, analytics: Option<Value>) {
        self.analytics = analytics;
    }

    /// Forget everything so the next request starts a new backend conversation.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
