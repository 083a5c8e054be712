//! Terminal rendering of messages, sources and session summaries
//!
//! Formatting functions return `String`s so they can be tested without a
//! terminal; callers print them.

use crate::api::BackendStatus;
use crate::session::{ChatSession, Message, Role, Source, SourceType};
use colored::Colorize;
use prettytable::{format, Table};

/// Longest excerpt printed for a source before it is cut
const SOURCE_EXCERPT_CHARS: usize = 300;

/// Render one message with its badge and sources
pub fn format_message(message: &Message) -> String {
    let mut out = String::new();

    let speaker = match message.role {
        Role::User => "You".cyan().bold(),
        Role::Assistant => "Mira".magenta().bold(),
    };
    out.push_str(&speaker.to_string());
    if let Some(ts) = message.timestamp {
        out.push_str(&format!(" {}", ts.format("%H:%M").to_string().dimmed()));
    }
    if let Some(source_type) = message.source_type {
        out.push(' ');
        out.push_str(&source_type_badge(source_type));
    }
    out.push('\n');
    out.push_str(&message.content);
    out.push('\n');

    if !message.sources.is_empty() {
        out.push_str(&format_sources(&message.sources));
    }
    out
}

/// Colored label for where an answer came from
pub fn source_type_badge(source_type: SourceType) -> String {
    let label = format!("[{}]", source_type);
    match source_type {
        SourceType::KnowledgeBase => label.green().to_string(),
        SourceType::GeneralKnowledge => label.yellow().to_string(),
    }
}

/// Render the "N source(s)" block under an answer
pub fn format_sources(sources: &[Source]) -> String {
    let plural = if sources.len() > 1 { "s" } else { "" };
    let mut out = format!("\n{}\n", format!("{} source{}", sources.len(), plural).bold());

    for (idx, source) in sources.iter().enumerate() {
        let label = source
            .label()
            .unwrap_or_else(|| format!("Source {}", idx + 1));
        out.push_str(&format!("  {} {}", format!("[{}]", idx + 1).cyan(), label.bold()));
        if let Some(score) = &source.relevance_score {
            out.push_str(&format!(" {}", score.green()));
        } else if let Some(relevance) = source.relevance {
            out.push_str(&format!(" {}", format!("{:.0}%", relevance * 100.0).green()));
        }
        out.push('\n');

        let excerpt = crate::session::truncate_chars(source.content.trim(), SOURCE_EXCERPT_CHARS);
        let ellipsis = if source.content.trim().chars().count() > SOURCE_EXCERPT_CHARS {
            "..."
        } else {
            ""
        };
        out.push_str(&format!("      {}{}\n", excerpt.dimmed(), ellipsis.dimmed()));

        if let Some(method) = &source.extraction_method {
            out.push_str(&format!("      {}\n", format!("Method: {}", method).dimmed()));
        }
    }
    out
}

/// Build the session list table; the active session is marked with `*`
pub fn sessions_table(sessions: &[&ChatSession], active_id: &str) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "".bold(),
        "ID".bold(),
        "Title".bold(),
        "Preview".bold(),
        "Updated".bold()
    ]);

    for session in sessions {
        let marker = if session.id == active_id { "*" } else { "" };
        let preview = crate::session::truncate_chars(&session.preview, 40);
        table.add_row(prettytable::row![
            marker.green(),
            session.id.cyan(),
            session.title,
            preview,
            session.timestamp.format("%Y-%m-%d %H:%M").to_string()
        ]);
    }
    table
}

/// Multi-line description of the backend status
pub fn format_status(status: &BackendStatus) -> String {
    let state = if status.initialized {
        "ready".green()
    } else {
        "not initialized".yellow()
    };
    let provider = status.provider.as_deref().unwrap_or("-");
    format!(
        "Backend: {}\nProvider: {}\nDocuments: {}\nPDFs: {}",
        state, provider, status.stats.documents, status.stats.pdfs
    )
}
