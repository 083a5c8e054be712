//! Conversation data model
//!
//! Messages, the sources attached to assistant answers, and the session
//! summaries shown in the session list. Everything here serializes to the
//! same JSON shape the backend speaks, so a persisted transcript and a chat
//! response share one set of types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Fixed assistant reply substituted when the backend call fails
pub const FALLBACK_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

/// Title used for a session that has no user message yet
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Text typed by the user
    User,
    /// Answer (or fallback) produced for the user
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Where an answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Answer grounded in the indexed document collection
    KnowledgeBase,
    /// Answer produced from the model's general knowledge
    GeneralKnowledge,
}

impl SourceType {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "knowledge_base" => Some(SourceType::KnowledgeBase),
            "general_knowledge" => Some(SourceType::GeneralKnowledge),
            _ => None,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::KnowledgeBase => write!(f, "Knowledge Base"),
            SourceType::GeneralKnowledge => write!(f, "General Knowledge"),
        }
    }
}

/// Page reference of a source; the backend sends either a number or a label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageRef {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRef::Number(n) => write!(f, "{}", n),
            PageRef::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Citation attached to an assistant message, kept verbatim from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Excerpt of the cited document
    pub content: String,
    /// Document the excerpt was taken from (usually a file name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Page within the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageRef>,
    /// Display title, preferred over `source`/`page` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Raw relevance score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    /// Preformatted relevance, e.g. "87%"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<String>,
    /// How the text was pulled out of the document (e.g. "ocr")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<String>,
}

impl Source {
    /// Create a source carrying only its excerpt
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
            page: None,
            title: None,
            relevance: None,
            relevance_score: None,
            extraction_method: None,
        }
    }

    /// Label shown above the excerpt
    ///
    /// Uses `title` when present, otherwise `"<source> - <page>"` with missing
    /// parts left out. Returns `None` when the backend supplied neither.
    ///
    /// # Examples
    ///
    /// ```
    /// use mira::session::{PageRef, Source};
    ///
    /// let mut source = Source::new("...");
    /// source.source = Some("guide.pdf".to_string());
    /// source.page = Some(PageRef::Text("iv".to_string()));
    /// assert_eq!(source.label().as_deref(), Some("guide.pdf - iv"));
    /// ```
    pub fn label(&self) -> Option<String> {
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            return Some(title.to_string());
        }
        match (&self.source, &self.page) {
            (Some(source), Some(page)) => Some(format!("{} - {}", source, page)),
            (Some(source), None) => Some(source.clone()),
            (None, Some(page)) => Some(format!("Page {}", page)),
            (None, None) => None,
        }
    }
}

/// One entry in a conversation
///
/// Messages are created once and never edited; a conversation only grows
/// by appending or is cleared as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_source_type"
    )]
    pub source_type: Option<SourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sources: Vec<Source>,
}

impl Message {
    /// Creates a user message stamped with the current time
    ///
    /// # Examples
    ///
    /// ```
    /// use mira::session::{Message, Role};
    ///
    /// let msg = Message::user("What is a data warehouse?");
    /// assert_eq!(msg.role, Role::User);
    /// assert!(msg.timestamp.is_some());
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            source_type: None,
            timestamp: Some(Utc::now()),
            sources: Vec::new(),
        }
    }

    /// Creates an assistant message without source metadata
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            source_type: None,
            timestamp: Some(Utc::now()),
            sources: Vec::new(),
        }
    }

    /// Creates an assistant answer with its provenance
    pub fn answer(
        content: impl Into<String>,
        source_type: Option<SourceType>,
        sources: Vec<Source>,
    ) -> Self {
        Self {
            source_type,
            sources,
            ..Self::assistant(content)
        }
    }

    /// The assistant message used when the backend could not answer
    pub fn fallback() -> Self {
        Self::assistant(FALLBACK_MESSAGE)
    }
}

/// Summary of one conversation as listed in the session list
///
/// This is derived from the transcript and rebuilt on every change; it
/// never holds messages itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub timestamp: DateTime<Utc>,
}

/// First `max_chars` characters of `text`, never splitting a character
///
/// # Examples
///
/// ```
/// use mira::session::truncate_chars;
///
/// assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
/// assert_eq!(truncate_chars("hi", 50), "hi");
/// ```
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Older transcripts and some backends send `"sources": null`
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Source>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Source>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Unknown source types are dropped rather than failing the whole message
pub(crate) fn lenient_source_type<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<SourceType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        let parsed = SourceType::parse(&value);
        if parsed.is_none() {
            tracing::debug!(source_type = %value, "Ignoring unknown source type");
        }
        parsed
    }))
}
