//! Live console rendering of a streaming exchange

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use ragdesk_application::{ChatError, ChatObserver};
use ragdesk_domain::{CANCELLED_MARKER, ConversationTurn};
use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Prints tokens as they arrive, with a spinner while waiting for the first one.
pub struct ConsoleObserver {
    show_progress: bool,
    spinner: Mutex<Option<ProgressBar>>,
    /// Bytes printed live for the current exchange
    printed: AtomicUsize,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self {
            show_progress: true,
            spinner: Mutex::new(None),
            printed: AtomicUsize::new(0),
        }
    }

    /// Set whether to show the waiting spinner
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn clear_spinner(&self) {
        let spinner = self
            .spinner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
    }
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatObserver for ConsoleObserver {
    fn on_exchange_started(&self, _user_turn: &ConversationTurn) {
        self.printed.store(0, Ordering::Relaxed);
        if !self.show_progress {
            return;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_message("Searching documents...");
        pb.enable_steady_tick(Duration::from_millis(100));
        *self.spinner.lock().unwrap_or_else(|e| e.into_inner()) = Some(pb);
    }

    fn on_stream_start(&self, _session_id: Option<&str>, sources: &[String]) {
        let guard = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = guard.as_ref() {
            pb.set_message(format!("Writing answer ({} sources)...", sources.len()));
        }
    }

    fn on_token(&self, chunk: &str) {
        self.clear_spinner();
        self.printed.fetch_add(chunk.len(), Ordering::Relaxed);
        print!("{}", chunk);
        let _ = std::io::stdout().flush();
    }

    fn on_complete(&self, turn: &ConversationTurn) {
        self.clear_spinner();
        // Nothing was printed live when the server only sent the final record
        if self.printed.load(Ordering::Relaxed) == 0 {
            print!("{}", turn.content());
        }
        println!();
    }

    fn on_error(&self, error: &ChatError) {
        self.clear_spinner();
        println!();
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    fn on_cancelled(&self, _turn: Option<&ConversationTurn>) {
        self.clear_spinner();
        if self.printed.load(Ordering::Relaxed) > 0 {
            println!();
        }
        println!("{}", CANCELLED_MARKER.yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printed_counter_resets_per_exchange() {
        let observer = ConsoleObserver::new().with_progress(false);
        let question = ConversationTurn::user("q");

        observer.on_exchange_started(&question);
        observer.on_token("He");
        observer.on_token("llo");
        assert_eq!(observer.printed.load(Ordering::Relaxed), 5);

        observer.on_exchange_started(&question);
        assert_eq!(observer.printed.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_spinner_cleared_by_first_token() {
        let observer = ConsoleObserver::new();
        observer.on_exchange_started(&ConversationTurn::user("q"));
        assert!(observer.spinner.lock().unwrap().is_some());

        observer.on_token("A");
        assert!(observer.spinner.lock().unwrap().is_none());
    }
}
