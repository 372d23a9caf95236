//! REPL (Read-Eval-Print Loop) for interactive chat

use crate::ConsoleFormatter;
use colored::Colorize;
use ragdesk_application::{SessionDirectory, StreamOutcome, StreamingChatClient};
use ragdesk_domain::ChatMode;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Sessions listed per `/sessions` page
const PAGE_SIZE: u32 = 20;

/// Offset of the first session on a 1-based page, if it fits in `u32`.
fn page_offset(page: u32) -> Option<u32> {
    page.checked_sub(1)?.checked_mul(PAGE_SIZE)
}

/// A parsed slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Quit,
    /// Show the current mode, or switch to another one
    Mode(Option<ChatMode>),
    /// Empty the transcript, keep the backend session
    Clear,
    /// Empty the transcript and start a new backend session
    New,
    /// List stored sessions (1-based page)
    Sessions { page: u32 },
    /// Current transcript, or a stored session's when an id is given
    History(Option<String>),
    Resume(String),
    Delete(String),
    Sources,
    Session,
}

impl ReplCommand {
    /// Parse a line starting with `/`.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::to_string);

        let command = match name {
            "/quit" | "/exit" | "/q" => ReplCommand::Quit,
            "/help" | "/h" | "/?" => ReplCommand::Help,
            "/mode" => match arg {
                Some(raw) => ReplCommand::Mode(Some(raw.parse().map_err(|e| format!("{}", e))?)),
                None => ReplCommand::Mode(None),
            },
            "/clear" => ReplCommand::Clear,
            "/new" => ReplCommand::New,
            "/sessions" => {
                let page = match arg {
                    Some(raw) => raw
                        .parse::<u32>()
                        .ok()
                        .filter(|p| page_offset(*p).is_some())
                        .ok_or_else(|| format!("Invalid page number: {}", raw))?,
                    None => 1,
                };
                ReplCommand::Sessions { page }
            }
            "/history" => ReplCommand::History(arg),
            "/resume" => ReplCommand::Resume(arg.ok_or("Usage: /resume <session-id>")?),
            "/delete" => ReplCommand::Delete(arg.ok_or("Usage: /delete <session-id>")?),
            "/sources" => ReplCommand::Sources,
            "/session" => ReplCommand::Session,
            _ => return Err(format!("Unknown command: {}", name)),
        };
        Ok(command)
    }
}

/// Interactive chat REPL
pub struct ChatRepl {
    client: Arc<StreamingChatClient>,
    directory: Option<Arc<dyn SessionDirectory>>,
    show_sources: bool,
    history_file: Option<PathBuf>,
}

impl ChatRepl {
    /// Create a new ChatRepl
    pub fn new(client: Arc<StreamingChatClient>) -> Self {
        Self {
            client,
            directory: None,
            show_sources: true,
            history_file: None,
        }
    }

    /// Enable the stored-session commands
    pub fn with_session_directory(mut self, directory: Arc<dyn SessionDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Set whether to print citations after answers
    pub fn with_sources(mut self, show: bool) -> Self {
        self.show_sources = show;
        self
    }

    /// Override the readline history location
    pub fn with_history_file(mut self, path: Option<PathBuf>) -> Self {
        self.history_file = path;
        self
    }

    /// Run the interactive REPL
    pub async fn run(&self) -> RlResult<()> {
        let mut rl = DefaultEditor::new()?;

        let history_path = self
            .history_file
            .clone()
            .or_else(|| dirs::data_dir().map(|p| p.join("ragdesk").join("history.txt")));

        if let Some(ref path) = history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(path);
        }

        self.print_welcome();

        loop {
            let prompt = format!("{}> ", self.client.mode());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(line);

                    if line.starts_with('/') {
                        match ReplCommand::parse(line) {
                            Ok(command) => {
                                if self.handle_command(command).await {
                                    break;
                                }
                            }
                            Err(message) => {
                                println!("{}", message);
                                println!("Type /help for available commands");
                            }
                        }
                        continue;
                    }

                    println!();
                    self.ask(line).await;
                    println!();
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(ref path) = history_path {
            let _ = rl.save_history(path);
        }

        Ok(())
    }

    /// Send one question, streaming the answer to the console. Ctrl-C aborts
    /// the response and keeps what has arrived.
    pub async fn ask(&self, question: &str) -> Option<StreamOutcome> {
        let client = Arc::clone(&self.client);
        let question = question.to_string();
        let mut task = tokio::spawn(async move { client.send_message(&question).await });

        let joined = tokio::select! {
            joined = &mut task => joined,
            _ = tokio::signal::ctrl_c() => {
                self.client.abort_stream();
                task.await
            }
        };

        match joined {
            Ok(Ok(outcome)) => {
                if outcome.is_completed() && self.show_sources {
                    self.print_sources();
                }
                Some(outcome)
            }
            Ok(Err(e)) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
                None
            }
            Err(e) => {
                warn!("Chat task ended abnormally: {}", e);
                None
            }
        }
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│              ragdesk - Chat Mode            │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        println!(
            "Mode: {} ({})",
            self.client.mode().to_string().cyan(),
            self.client.mode().description()
        );
        println!("Press Ctrl-C while an answer streams to stop it.");
        Self::print_help();
    }

    fn print_help() {
        println!();
        println!("Commands:");
        println!("  /help, /h, /?      - Show this help");
        println!("  /mode [name]       - Show or switch mode (starts a new conversation)");
        println!("  /clear             - Clear the transcript, keep the session");
        println!("  /new               - Start a new session");
        println!("  /session           - Show the current session id");
        println!("  /sources           - Show sources of the last answer");
        println!("  /sessions [page]   - List stored sessions");
        println!("  /history [id]      - Show this or a stored conversation");
        println!("  /resume <id>       - Continue a stored session");
        println!("  /delete <id>       - Delete a stored session");
        println!("  /quit, /exit, /q   - Exit chat");
        println!();
    }

    fn print_sources(&self) {
        print!("{}", ConsoleFormatter::format_sources(&self.client.sources()));
        if let Some(analytics) = self.client.analytics() {
            print!("{}", ConsoleFormatter::format_analytics(&analytics));
        }
    }

    fn require_directory(&self) -> Option<&Arc<dyn SessionDirectory>> {
        if self.directory.is_none() {
            println!("Stored sessions are not available with this backend.");
        }
        self.directory.as_ref()
    }

    /// Handle slash commands. Returns true if should exit.
    pub async fn handle_command(&self, command: ReplCommand) -> bool {
        match command {
            ReplCommand::Quit => {
                println!("Bye!");
                return true;
            }
            ReplCommand::Help => Self::print_help(),
            ReplCommand::Mode(None) => {
                println!();
                for mode in ChatMode::ALL {
                    let marker = if mode == self.client.mode() { "*" } else { " " };
                    println!(" {} {:<12} {}", marker, mode.as_str(), mode.description());
                }
                println!();
            }
            ReplCommand::Mode(Some(mode)) => match self.client.switch_mode(mode) {
                Ok(()) => println!("Switched to {} mode. New conversation started.", mode),
                Err(e) => println!("{}", e),
            },
            ReplCommand::Clear => {
                self.client.clear_messages();
                println!("Transcript cleared.");
            }
            ReplCommand::New => {
                self.client.clear_messages();
                self.client.reset_session();
                println!("New session started.");
            }
            ReplCommand::Session => match self.client.session_id() {
                Some(id) => println!("Session: {}", id),
                None => println!("No session yet; one starts with the next question."),
            },
            ReplCommand::Sources => {
                if self.client.sources().is_empty() && self.client.analytics().is_none() {
                    println!("No sources for the last answer.");
                } else {
                    self.print_sources();
                }
            }
            ReplCommand::History(None) => {
                let turns = self.client.turns();
                if turns.is_empty() {
                    println!("Nothing said yet.");
                }
                for turn in &turns {
                    println!("{}", ConsoleFormatter::format_turn(turn));
                }
            }
            ReplCommand::History(Some(id)) => {
                if let Some(directory) = self.require_directory() {
                    match directory.session_history(&id).await {
                        Ok(history) => print!("{}", ConsoleFormatter::format_history(&history)),
                        Err(e) => println!("Could not load session {}: {}", id, e),
                    }
                }
            }
            ReplCommand::Sessions { page } => {
                if let Some(directory) = self.require_directory() {
                    let Some(offset) = page_offset(page) else {
                        println!("Page {} is out of range.", page);
                        return false;
                    };
                    match directory.list_sessions(PAGE_SIZE, offset).await {
                        Ok(listing) => {
                            print!("{}", ConsoleFormatter::format_session_page(&listing, offset))
                        }
                        Err(e) => println!("Could not list sessions: {}", e),
                    }
                }
            }
            ReplCommand::Resume(id) => {
                if let Some(directory) = self.require_directory() {
                    self.resume(directory.as_ref(), &id).await;
                }
            }
            ReplCommand::Delete(id) => {
                if let Some(directory) = self.require_directory() {
                    match directory.delete_session(&id).await {
                        Ok(()) => {
                            if self.client.session_id().as_deref() == Some(id.as_str()) {
                                self.client.clear_messages();
                                self.client.reset_session();
                            }
                            println!("Deleted session {}.", id);
                        }
                        Err(e) => println!("Could not delete session {}: {}", id, e),
                    }
                }
            }
        }
        false
    }

    async fn resume(&self, directory: &dyn SessionDirectory, id: &str) {
        let history = match directory.session_history(id).await {
            Ok(history) => history,
            Err(e) => {
                println!("Could not load session {}: {}", id, e);
                return;
            }
        };

        if let Ok(mode) = history.mode.parse::<ChatMode>()
            && mode != self.client.mode()
            && let Err(e) = self.client.switch_mode(mode)
        {
            println!("{}", e);
            return;
        }

        match self.client.restore(&history.session_id, history.turns()) {
            Ok(()) => {
                print!("{}", ConsoleFormatter::format_history(&history));
                println!("Resumed session {}.", history.session_id);
            }
            Err(e) => println!("{}", e),
        }
    }
}
