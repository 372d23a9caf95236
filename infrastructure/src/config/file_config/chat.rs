//! Chat configuration from TOML (`[chat]` section)

use ragdesk_domain::ChatMode;
use serde::{Deserialize, Serialize};

/// Raw chat configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChatConfig {
    /// Mode used for new conversations
    pub mode: ChatMode,
}
