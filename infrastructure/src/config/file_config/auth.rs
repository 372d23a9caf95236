//! Credentials from TOML (`[auth]` section)

use serde::{Deserialize, Serialize};

/// Raw auth configuration from TOML
///
/// Usually supplied through `RAGDESK_AUTH__TOKEN` / `RAGDESK_AUTH__USER_EMAIL`
/// rather than written to a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAuthConfig {
    /// Bearer token sent as `Authorization`
    pub token: Option<String>,
    /// Identity sent as `X-User-Email`
    pub user_email: Option<String>,
}
