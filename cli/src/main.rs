//! CLI entrypoint for ragdesk
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use ragdesk_application::{
    ConversationLogger, NoConversationLogger, StreamOutcome, StreamingChatClient,
};
use ragdesk_infrastructure::{
    AuthSession, ConfigLoader, FileConfig, HttpChatTransport, HttpSessionDirectory,
    JsonlConversationLogger,
};
use ragdesk_presentation::{ChatRepl, Cli, ConsoleObserver};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    info!("Starting ragdesk");

    // === Configuration ===
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        if let Some(path) = &cli.config
            && !path.exists()
        {
            bail!("Config file not found: {}", path.display());
        }
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?
    };
    apply_overrides(&mut config, &cli);

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        println!();
        println!("Effective configuration:");
        println!("{}", toml::to_string_pretty(&config.redacted())?);
        return Ok(ExitCode::SUCCESS);
    }

    let issues = config.validate();
    for issue in issues.iter().filter(|i| !i.is_error()) {
        warn!("Config: {}", issue);
    }
    let errors: Vec<String> = issues
        .iter()
        .filter(|i| i.is_error())
        .map(|i| i.to_string())
        .collect();
    if !errors.is_empty() {
        bail!("Invalid configuration:\n  {}", errors.join("\n  "));
    }

    // === Dependency Injection ===
    let auth = Arc::new(AuthSession::from_config(&config.auth));
    match auth.user_email() {
        Some(email) => info!("Requests identify as {}", email),
        None => warn!("No user email configured; stored sessions may not be available"),
    }
    let transport = Arc::new(
        HttpChatTransport::new(&config.server, auth.clone())
            .context("Failed to create chat transport")?,
    );
    let directory = Arc::new(
        HttpSessionDirectory::new(&config.server, auth.clone())
            .context("Failed to create session client")?,
    );
    info!("Backend: {}", transport.endpoint());

    let conversation_logger: Arc<dyn ConversationLogger> =
        match config.logging.conversation_log.as_deref() {
            Some(path) => match JsonlConversationLogger::new(expand_home(path)) {
                Some(logger) => {
                    info!("Conversation log: {}", logger.path().display());
                    Arc::new(logger)
                }
                None => Arc::new(NoConversationLogger),
            },
            None => Arc::new(NoConversationLogger),
        };

    let observer = Arc::new(ConsoleObserver::new().with_progress(!cli.quiet));
    let client = Arc::new(
        StreamingChatClient::new(transport)
            .with_mode(config.chat.mode)
            .with_observer(observer)
            .with_conversation_logger(conversation_logger),
    );

    let repl = ChatRepl::new(client)
        .with_session_directory(directory)
        .with_sources(config.repl.show_sources)
        .with_history_file(config.repl.history_file.as_deref().map(expand_home));

    // Chat mode
    if cli.chat {
        repl.run().await?;
        auth.dispose();
        return Ok(ExitCode::SUCCESS);
    }

    // Single question mode - question is required
    let question = match cli.question {
        Some(q) => q,
        None => bail!("Question is required. Use --chat for interactive mode."),
    };

    let outcome = repl.ask(&question).await;
    auth.dispose();

    // Errors were already printed by the observer
    Ok(match outcome {
        Some(StreamOutcome::Completed { .. }) | Some(StreamOutcome::Cancelled { .. }) => {
            ExitCode::SUCCESS
        }
        Some(StreamOutcome::Failed(_)) | None => ExitCode::FAILURE,
    })
}

/// Initialize logging based on verbosity level. With a log file, output goes
/// through a non-blocking writer whose guard must outlive `main`.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", path.display()))?;
    std::fs::create_dir_all(&directory)
        .with_context(|| format!("Could not create log directory {}", directory.display()))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

/// Command-line flags win over every config source.
fn apply_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(base_url) = &cli.base_url {
        config.server.base_url = base_url.clone();
    }
    if let Some(email) = &cli.user_email {
        config.auth.user_email = Some(email.clone());
    }
    if let Some(mode) = cli.mode {
        config.chat.mode = mode;
    }
    if cli.no_sources {
        config.repl.show_sources = false;
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
