//! Backend server configuration from TOML (`[server]` section)

use serde::{Deserialize, Serialize};

/// Raw server configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    /// Scheme, host and port of the chat backend
    pub base_url: String,
    /// Path of the streaming chat endpoint
    pub stream_path: String,
    /// Path of the stored-session API
    pub sessions_path: String,
    /// Seconds to wait for the response headers (the stream itself is not capped)
    pub timeout_secs: u64,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            stream_path: "/api/chat/stream".to_string(),
            sessions_path: "/api/v1/sessions".to_string(),
            timeout_secs: 30,
        }
    }
}

impl FileServerConfig {
    pub fn stream_url(&self) -> String {
        join_url(&self.base_url, &self.stream_path)
    }

    pub fn sessions_url(&self) -> String {
        join_url(&self.base_url, &self.sessions_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
