//! Per-provider selector catalogs.
//!
//! Each provider maps to an ordered list of [`SelectorGroup`]s. The first
//! group describes the current share-page markup; later groups cover older
//! layouts and finally generic shapes that still isolate one turn per node.

use crate::provider::Provider;

use super::SelectorGroup;

const CHATGPT: &[SelectorGroup] = &[
    SelectorGroup::new("chatgpt-author-role", &["[data-message-author-role]"]),
    SelectorGroup::new(
        "chatgpt-conversation-turn",
        &[
            "article[data-testid^=\"conversation-turn\"]",
            "div[data-testid^=\"conversation-turn\"]",
        ],
    ),
    SelectorGroup::new("chatgpt-group", &["div.group.w-full", ".text-message"]),
    SelectorGroup::new("chatgpt-main-article", &["main article"]),
];

const CLAUDE: &[SelectorGroup] = &[
    SelectorGroup::new(
        "claude-testid",
        &[
            "[data-testid=\"user-message\"]",
            ".font-claude-message",
            ".font-claude-response",
        ],
    ),
    SelectorGroup::new("claude-render-count", &["div[data-test-render-count] > div"]),
    SelectorGroup::new("claude-prose", &[".font-user-message", ".prose"]),
];

const GEMINI: &[SelectorGroup] = &[
    SelectorGroup::new("gemini-turn-tags", &["user-query", "model-response"]),
    SelectorGroup::new(
        "gemini-share-viewer",
        &["share-turn-viewer user-query", "share-turn-viewer response-container"],
    ),
    SelectorGroup::new("gemini-text-blocks", &[".query-text", ".model-response-text"]),
    SelectorGroup::new("gemini-message-content", &["message-content"]),
];

const GROK: &[SelectorGroup] = &[
    SelectorGroup::new("grok-bubble", &["div.message-bubble"]),
    SelectorGroup::new("grok-testid", &["[data-testid=\"message\"]"]),
    SelectorGroup::new("grok-markdown", &[".response-content-markdown"]),
];

/// Ordered selector groups for `provider`, most specific first.
#[must_use]
pub const fn catalog(provider: Provider) -> &'static [SelectorGroup] {
    match provider {
        Provider::ChatGpt => CHATGPT,
        Provider::Claude => CLAUDE,
        Provider::Gemini => GEMINI,
        Provider::Grok => GROK,
    }
}
