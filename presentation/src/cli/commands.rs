//! CLI command definitions

use clap::Parser;
use ragdesk_domain::ChatMode;
use std::path::PathBuf;

/// CLI arguments for ragdesk
#[derive(Parser, Debug)]
#[command(name = "ragdesk")]
#[command(author, version, about = "Terminal client for a streaming document-chat backend")]
#[command(long_about = r#"
ragdesk asks questions of a retrieval-augmented chat backend and prints the
answer as it streams in, followed by the documents it cites.

Modes:
  strategy_qa   Questions about strategy documents (default)
  actions       Action items and owners
  analytics     Figures and trends, with an analytics payload
  regulatory    Regulatory filings and obligations

Configuration files are loaded from (in priority order):
1. RAGDESK_* environment variables (e.g. RAGDESK_SERVER__BASE_URL)
2. --config <path>       Explicit config file
3. ./ragdesk.toml        Project-level config
4. ~/.config/ragdesk/config.toml   Global config

Example:
  ragdesk "What does the 2030 plan say about storage?"
  ragdesk --mode analytics "How did outage minutes change last year?"
  ragdesk --chat --mode regulatory
"#)]
pub struct Cli {
    /// The question to ask (not required in chat mode)
    pub question: Option<String>,

    /// Start interactive chat mode
    #[arg(short, long)]
    pub chat: bool,

    /// Conversation mode (strategy_qa, actions, analytics, regulatory)
    #[arg(short, long, value_name = "MODE")]
    pub mode: Option<ChatMode>,

    /// Backend base URL (overrides config)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Identity sent as X-User-Email (overrides config)
    #[arg(long, value_name = "EMAIL")]
    pub user_email: Option<String>,

    /// Do not print cited sources after answers
    #[arg(long)]
    pub no_sources: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Write diagnostic logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and the effective config, then exit
    #[arg(long)]
    pub show_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_question_with_mode() {
        let cli = Cli::parse_from(["ragdesk", "--mode", "analytics", "Outage trend?"]);
        assert_eq!(cli.mode, Some(ChatMode::Analytics));
        assert_eq!(cli.question.as_deref(), Some("Outage trend?"));
        assert!(!cli.chat);
    }

    #[test]
    fn test_parse_chat_flags() {
        let cli = Cli::parse_from(["ragdesk", "--chat", "-vv", "-q", "--no-sources"]);
        assert!(cli.chat);
        assert_eq!(cli.verbose, 2);
        assert!(cli.quiet);
        assert!(cli.no_sources);
        assert!(cli.question.is_none());
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["ragdesk", "--mode", "poetry", "q"]).is_err());
    }
}
