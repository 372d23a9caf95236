//! Chat mode value object
//!
//! The backend answers questions in one of several modes, each with its own
//! system prompt and retrieval behaviour. The client only selects one and
//! forwards its wire name with every request.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Question-answering mode sent with each chat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    /// Strategy documents Q&A (default)
    #[default]
    StrategyQa,
    /// Action items and follow-ups
    Actions,
    /// Answers grounded in the latest analytics snapshot
    Analytics,
    /// Regulatory and compliance questions
    Regulatory,
}

impl ChatMode {
    /// All modes in display order.
    pub const ALL: [ChatMode; 4] = [
        ChatMode::StrategyQa,
        ChatMode::Actions,
        ChatMode::Analytics,
        ChatMode::Regulatory,
    ];

    /// The value the backend expects in the `mode` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::StrategyQa => "strategy_qa",
            ChatMode::Actions => "actions",
            ChatMode::Analytics => "analytics",
            ChatMode::Regulatory => "regulatory",
        }
    }

    /// Get a short description for display
    pub fn description(&self) -> &'static str {
        match self {
            ChatMode::StrategyQa => "Strategy Q&A over ingested documents",
            ChatMode::Actions => "Extract actions and owners",
            ChatMode::Analytics => "Questions about the latest analytics snapshot",
            ChatMode::Regulatory => "Regulatory and compliance guidance",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChatMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "strategy_qa" | "strategy" | "qa" => Ok(ChatMode::StrategyQa),
            "actions" | "action" => Ok(ChatMode::Actions),
            "analytics" => Ok(ChatMode::Analytics),
            "regulatory" => Ok(ChatMode::Regulatory),
            _ => Err(DomainError::InvalidMode(s.to_string())),
        }
    }
}
