//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod auth;
mod chat;
mod logging;
mod repl;
mod server;

pub use auth::FileAuthConfig;
pub use chat::FileChatConfig;
pub use logging::FileLoggingConfig;
pub use repl::FileReplConfig;
pub use server::FileServerConfig;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Backend endpoints and timeouts
    pub server: FileServerConfig,
    /// Chat defaults
    pub chat: FileChatConfig,
    /// Credentials
    pub auth: FileAuthConfig,
    /// REPL settings
    pub repl: FileReplConfig,
    /// Conversation log settings
    pub logging: FileLoggingConfig,
}

/// How serious a configuration problem is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Usable, but probably not what the user meant
    Warning,
    /// The client cannot run with this value
    Error,
}

/// A single problem found by [`FileConfig::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub field: &'static str,
    pub message: String,
}

impl ConfigIssue {
    fn error(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            field,
            message: message.into(),
        }
    }

    fn warning(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            field,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl FileConfig {
    /// Check values that deserialize fine but cannot work.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        match reqwest::Url::parse(&self.server.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => issues.push(ConfigIssue::error(
                "server.base_url",
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => issues.push(ConfigIssue::error(
                "server.base_url",
                format!("'{}' is not a valid URL ({})", self.server.base_url, e),
            )),
        }

        for (field, path) in [
            ("server.stream_path", &self.server.stream_path),
            ("server.sessions_path", &self.server.sessions_path),
        ] {
            if !path.starts_with('/') {
                issues.push(ConfigIssue::error(
                    field,
                    format!("'{}' must start with '/'", path),
                ));
            }
        }

        if self.server.timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                "server.timeout_secs",
                "timeout cannot be 0",
            ));
        }

        if let Some(token) = &self.auth.token
            && token.trim().is_empty()
        {
            issues.push(ConfigIssue::warning(
                "auth.token",
                "empty token will be ignored",
            ));
        }

        if let Some(email) = &self.auth.user_email
            && !email.contains('@')
        {
            issues.push(ConfigIssue::warning(
                "auth.user_email",
                format!("'{}' does not look like an email address", email),
            ));
        }

        issues
    }

    /// Copy safe to print: the token is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.auth.token.is_some() {
            copy.auth.token = Some("********".to_string());
        }
        copy
    }
}
