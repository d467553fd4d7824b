//! Message extraction.
//!
//! Turns a parsed page snapshot plus a confirmed selector into an
//! [`ExtractionResult`].
//!
//! # Module Structure
//!
//! - `clean`: chrome removal and code normalization on a detached copy
//! - `role`: role inference and the alternating fallback
//!
//! # Usage
//!
//! ```rust
//! use chrono::Utc;
//! use share_scribe::{dom, extractor, Provider, Role};
//!
//! let doc = dom::parse(r#"
//!     <main>
//!       <div data-message-author-role="user"><p>What is 2 + 2?</p></div>
//!       <div data-message-author-role="assistant"><p>4</p></div>
//!     </main>
//! "#);
//! let result = extractor::extract(
//!     &doc,
//!     Provider::ChatGpt,
//!     "[data-message-author-role]",
//!     None,
//!     Utc::now(),
//! ).unwrap();
//!
//! assert_eq!(result.messages().len(), 2);
//! assert_eq!(result.messages()[0].role, Role::User);
//! assert_eq!(result.title(), "What is 2 + 2?");
//! ```

pub mod clean;
pub mod role;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::dom::{self, Document};
use crate::error::{Error, Result};
use crate::patterns::{TITLE_BRANDING, WHITESPACE_RUN};
use crate::provider::Provider;
use crate::result::{ExtractionResult, Role, ScrapedMessage};

pub use clean::clean_message;
pub use role::{apply_alternating_fallback, infer_role};

/// Used when neither the page nor the messages yield a title.
pub const FALLBACK_TITLE: &str = "Conversation";

/// Longest title derived from the first user message.
pub const MAX_DERIVED_TITLE_CHARS: usize = 80;

/// Page titles that carry no information about the conversation.
const GENERIC_TITLES: &[&str] = &[
    "chatgpt",
    "claude",
    "gemini",
    "google gemini",
    "grok",
    "shared conversation",
    "shared chat",
    "new chat",
];

/// Extract messages matched by `selector`, in document order.
///
/// Roles may still be [`Role::Unknown`]; [`ExtractionResult::new`] resolves
/// them.
pub fn extract_messages(
    doc: &Document,
    provider: Provider,
    selector: &str,
) -> Result<Vec<ScrapedMessage>> {
    let nodes = dom::collect_matches(&doc.root(), selector);
    debug!(%provider, selector, matched = nodes.len(), "collecting messages");

    let messages: Vec<ScrapedMessage> = nodes
        .iter()
        .filter_map(|node| {
            let role = infer_role(node, provider);
            clean_message(node).map(|html| ScrapedMessage::new(role, html))
        })
        .collect();

    if messages.is_empty() {
        return Err(Error::NoMessagesFound);
    }
    Ok(messages)
}

/// Extract a complete [`ExtractionResult`] from a snapshot.
pub fn extract(
    doc: &Document,
    provider: Provider,
    selector: &str,
    title_override: Option<&str>,
    retrieved_at: DateTime<Utc>,
) -> Result<ExtractionResult> {
    let mut messages = extract_messages(doc, provider, selector)?;
    // Resolve roles first so the title fallback can find the first user turn.
    apply_alternating_fallback(&mut messages);
    let title = resolve_title(doc, title_override, &messages);
    Ok(ExtractionResult::new(title, messages, retrieved_at))
}

/// Title override, then the cleaned page title, then the first user
/// message, then [`FALLBACK_TITLE`].
#[must_use]
pub fn resolve_title(
    doc: &Document,
    title_override: Option<&str>,
    messages: &[ScrapedMessage],
) -> String {
    if let Some(title) = title_override.map(str::trim).filter(|t| !t.is_empty()) {
        return title.to_string();
    }
    if let Some(title) = page_title(doc) {
        return title;
    }
    messages
        .iter()
        .find(|m| m.role == Role::User)
        .and_then(|m| message_title(&m.html))
        .unwrap_or_else(|| FALLBACK_TITLE.to_string())
}

/// Page `<title>` without provider branding, if it says anything.
#[must_use]
pub fn page_title(doc: &Document) -> Option<String> {
    let raw = doc.select("title").first().text();
    let collapsed = WHITESPACE_RUN.replace_all(raw.trim(), " ");
    let cleaned = TITLE_BRANDING.replace_all(&collapsed, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || GENERIC_TITLES.contains(&cleaned.to_lowercase().as_str()) {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn message_title(html: &str) -> Option<String> {
    let doc = dom::parse_fragment(html);
    let text = doc.select(dom::FRAGMENT_ROOT).text();
    let collapsed = WHITESPACE_RUN.replace_all(text.trim(), " ");
    let title: String = collapsed.chars().take(MAX_DERIVED_TITLE_CHARS).collect();
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}
