//! Console output formatting for answers, citations and stored sessions

use colored::Colorize;
use ragdesk_application::{SessionHistory, SessionPage};
use ragdesk_domain::util::{preview, truncate_str};
use ragdesk_domain::{ConversationTurn, Role};
use serde_json::Value;

/// Formats client state for terminal display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Numbered citation list, or an empty string when there are none.
    pub fn format_sources(sources: &[String]) -> String {
        if sources.is_empty() {
            return String::new();
        }
        let mut output = format!("{}\n", "Sources:".cyan().bold());
        for (i, source) in sources.iter().enumerate() {
            output.push_str(&format!("  [{}] {}\n", i + 1, source));
        }
        output
    }

    /// Analytics payload as indented JSON.
    pub fn format_analytics(analytics: &Value) -> String {
        let body = serde_json::to_string_pretty(analytics).unwrap_or_else(|_| analytics.to_string());
        let indented: Vec<String> = body.lines().map(|l| format!("  {}", l)).collect();
        format!("{}\n{}\n", "Analytics:".cyan().bold(), indented.join("\n"))
    }

    /// One line per stored session, newest first as the backend returns them.
    pub fn format_session_page(page: &SessionPage, offset: u32) -> String {
        if page.sessions.is_empty() {
            return "No stored sessions.\n".dimmed().to_string();
        }
        let mut output = String::new();
        for summary in &page.sessions {
            let title = summary.title.as_deref().unwrap_or("(untitled)");
            output.push_str(&format!(
                "  {}  {:<11} {:>3} msgs  {}  {}\n",
                summary.id.yellow(),
                summary.mode,
                summary.message_count,
                truncate_str(&summary.created_at, 16).dimmed(),
                preview(title, 50)
            ));
        }
        let shown_to = offset as u64 + page.sessions.len() as u64;
        output.push_str(
            &format!("Showing {}-{} of {}\n", offset + 1, shown_to, page.total)
                .dimmed()
                .to_string(),
        );
        output
    }

    /// Transcript of a stored session.
    pub fn format_history(history: &SessionHistory) -> String {
        let title = history.title.as_deref().unwrap_or("(untitled)");
        let mut output = format!(
            "{} {} [{}]\n\n",
            "Session:".cyan().bold(),
            title,
            history.mode
        );
        for turn in history.turns() {
            output.push_str(&Self::format_turn(&turn));
            output.push('\n');
        }
        output
    }

    /// A single turn with a role label.
    pub fn format_turn(turn: &ConversationTurn) -> String {
        let label = match turn.role() {
            Role::User => "You".green().bold(),
            Role::Assistant => "Assistant".blue().bold(),
        };
        let time = turn.created_at().format("%Y-%m-%d %H:%M");
        format!("{} {}\n{}\n", label, time.to_string().dimmed(), turn.content())
    }
}
