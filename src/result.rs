//! Result types for extraction output.
//!
//! This module defines the structured output of a scrape: the ordered
//! messages, the immutable extraction result built from them, and the
//! rendered Markdown/HTML pair.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::escalation::StageTrace;
use crate::extractor::role::apply_alternating_fallback;
use crate::markdown::conversation_markdown;
use crate::provider::ConversationSource;

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
    User,
    System,
    Tool,
    /// Not inferable from the DOM. Never survives into an [`ExtractionResult`].
    Unknown,
}

impl Role {
    /// Parse an attribute value such as `data-message-author-role="assistant"`.
    #[must_use]
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "assistant" | "model" | "bot" | "ai" => Some(Self::Assistant),
            "user" | "human" => Some(Self::User),
            "system" => Some(Self::System),
            "tool" | "function" => Some(Self::Tool),
            _ => None,
        }
    }

    /// Section heading used in the Markdown document.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Assistant => "Assistant",
            Self::User => "User",
            Self::System => "System",
            Self::Tool => "Tool",
            Self::Unknown => "Unknown",
        }
    }
}

/// One conversation turn with its cleaned inner HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedMessage {
    pub role: Role,
    pub html: String,
}

impl ScrapedMessage {
    #[must_use]
    pub fn new(role: Role, html: impl Into<String>) -> Self {
        Self {
            role,
            html: html.into(),
        }
    }
}

/// Messages of one successful scrape.
///
/// Built once and immutable afterwards. Construction resolves every
/// [`Role::Unknown`] through the alternating fallback, so consumers never
/// observe an unknown role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    title: String,
    messages: Vec<ScrapedMessage>,
    retrieved_at: DateTime<Utc>,
}

impl ExtractionResult {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        mut messages: Vec<ScrapedMessage>,
        retrieved_at: DateTime<Utc>,
    ) -> Self {
        apply_alternating_fallback(&mut messages);
        Self {
            title: title.into(),
            messages,
            retrieved_at,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Messages in document order.
    #[must_use]
    pub fn messages(&self) -> &[ScrapedMessage] {
        &self.messages
    }

    #[must_use]
    pub const fn retrieved_at(&self) -> DateTime<Utc> {
        self.retrieved_at
    }

    /// ISO-8601 retrieval timestamp with second precision.
    #[must_use]
    pub fn retrieved_at_iso(&self) -> String {
        self.retrieved_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Markdown and its standalone HTML twin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedDocument {
    pub markdown: String,
    pub html: String,
}

/// What a scrape hands to collaborators (file naming, publishing, logging).
#[derive(Debug, Clone, Serialize)]
pub struct ShareExport {
    pub source: ConversationSource,
    pub title: String,
    pub markdown: String,
    /// ISO-8601 timestamp.
    pub retrieved_at: String,
    pub result: ExtractionResult,
    /// Escalation stages that ran, in order.
    pub trace: Vec<StageTrace>,
}

impl ShareExport {
    /// Bundle a result with its Markdown rendering.
    #[must_use]
    pub fn new(source: ConversationSource, result: ExtractionResult, trace: Vec<StageTrace>) -> Self {
        let markdown = conversation_markdown(&result, source.url());
        Self {
            title: result.title().to_string(),
            retrieved_at: result.retrieved_at_iso(),
            source,
            markdown,
            result,
            trace,
        }
    }
}
