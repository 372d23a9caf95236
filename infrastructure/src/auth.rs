//! Explicit authentication context shared by the HTTP adapters.
//!
//! [`AuthSession`] is created once at startup, initialized from the `[auth]`
//! config section and handed to every adapter by `Arc`. Disposing it removes
//! the credentials so later requests go out anonymous.

use crate::config::FileAuthConfig;
use reqwest::RequestBuilder;
use reqwest::header::AUTHORIZATION;
use std::sync::RwLock;
use tracing::debug;

/// Header carrying the caller's identity
pub const USER_EMAIL_HEADER: &str = "X-User-Email";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Credentials {
    token: Option<String>,
    user_email: Option<String>,
}

/// Credentials attached to outgoing requests.
#[derive(Debug, Default)]
pub struct AuthSession {
    credentials: RwLock<Option<Credentials>>,
}

impl AuthSession {
    /// An uninitialized session; requests carry no credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and initialize from config in one step.
    pub fn from_config(config: &FileAuthConfig) -> Self {
        let session = Self::new();
        session.init(config.token.clone(), config.user_email.clone());
        session
    }

    /// Set the credentials. Blank values are treated as absent.
    pub fn init(&self, token: Option<String>, user_email: Option<String>) {
        let credentials = Credentials {
            token: token.filter(|t| !t.trim().is_empty()),
            user_email: user_email.filter(|e| !e.trim().is_empty()),
        };
        debug!(
            "Auth initialized (token: {}, user: {:?})",
            credentials.token.is_some(),
            credentials.user_email
        );
        *self.write() = Some(credentials);
    }

    /// Drop the credentials.
    pub fn dispose(&self) {
        *self.write() = None;
        debug!("Auth disposed");
    }

    pub fn user_email(&self) -> Option<String> {
        self.read().as_ref().and_then(|c| c.user_email.clone())
    }

    /// Attach `Authorization` and `X-User-Email` when present.
    pub fn apply(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(credentials) = self.read().as_ref() {
            if let Some(token) = &credentials.token {
                request = request.header(AUTHORIZATION, format!("Bearer {}", token));
            }
            if let Some(email) = &credentials.user_email {
                request = request.header(USER_EMAIL_HEADER, email);
            }
        }
        request
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Credentials>> {
        self.credentials.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Credentials>> {
        self.credentials.write().unwrap_or_else(|e| e.into_inner())
    }
}
