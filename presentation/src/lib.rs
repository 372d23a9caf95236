//! Presentation layer for ragdesk
//!
//! This crate contains the CLI definition, the interactive chat REPL, the
//! console observer that renders streaming answers, and output formatting.

pub mod chat;
pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use chat::{ChatRepl, ReplCommand};
pub use cli::commands::Cli;
pub use output::console::ConsoleFormatter;
pub use progress::observer::ConsoleObserver;
