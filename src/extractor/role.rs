//! Role inference.
//!
//! Reads the matched node without modifying it. Signals are tried from the
//! most to the least reliable; the first one that answers wins.

use dom_query::{NodeRef, Selection};

use crate::dom;
use crate::patterns::{
    ASSISTANT_KEYWORD, ASSISTANT_TEXT_PREFIX, SYSTEM_KEYWORD, TOOL_KEYWORD, USER_KEYWORD,
    USER_TEXT_PREFIX,
};
use crate::provider::Provider;
use crate::result::{Role, ScrapedMessage};

/// Attributes that name the author explicitly.
const ROLE_ATTRIBUTES: &[&str] = &["data-message-author-role", "data-author", "data-role"];

/// Attributes present only on assistant turns while (or after) they stream.
const STREAMING_ATTRIBUTES: &[&str] = &["data-is-streaming", "data-streaming"];

/// Infer the author of one matched turn.
#[must_use]
pub fn infer_role(node: &NodeRef, provider: Provider) -> Role {
    explicit_role(node)
        .or_else(|| structural_role(node, provider))
        .or_else(|| keyword_role(node))
        .or_else(|| text_prefix_role(node))
        .unwrap_or(Role::Unknown)
}

/// Role attribute on the node, or on its first descendant carrying one.
fn explicit_role(node: &NodeRef) -> Option<Role> {
    for attr in ROLE_ATTRIBUTES {
        if let Some(value) = node.attr(attr) {
            if let Some(role) = Role::from_attribute(&value) {
                return Some(role);
            }
        }
    }

    let sel = Selection::from(*node);
    let carrier = sel
        .select("[data-message-author-role], [data-author], [data-role]")
        .first();
    ROLE_ATTRIBUTES
        .iter()
        .find_map(|attr| carrier.attr(attr))
        .and_then(|value| Role::from_attribute(&value))
}

fn structural_role(node: &NodeRef, provider: Provider) -> Option<Role> {
    let sel = Selection::from(*node);
    let streaming = STREAMING_ATTRIBUTES
        .iter()
        .any(|attr| node.attr(attr).is_some() || sel.select(&format!("[{attr}]")).exists());
    if streaming {
        return Some(Role::Assistant);
    }

    match provider {
        Provider::Claude => {
            if sel.is(r#"[data-testid="user-message"]"#)
                || sel.select(r#"[data-testid="user-message"]"#).exists()
            {
                Some(Role::User)
            } else if sel.is(".font-claude-message, .font-claude-response")
                || sel.select(".font-claude-message, .font-claude-response").exists()
            {
                Some(Role::Assistant)
            } else {
                None
            }
        }
        Provider::Gemini => match dom::node_tag(node).as_deref() {
            Some("user-query") => Some(Role::User),
            Some("model-response" | "response-container") => Some(Role::Assistant),
            _ => {
                if sel.select("user-query").exists() {
                    Some(Role::User)
                } else if sel.select("model-response").exists() {
                    Some(Role::Assistant)
                } else {
                    None
                }
            }
        },
        Provider::Grok => bubble_alignment(node),
        Provider::ChatGpt => None,
    }
}

/// Grok right-aligns user bubbles and left-aligns responses.
fn bubble_alignment(node: &NodeRef) -> Option<Role> {
    let own = node.attr("class").map(|c| c.to_string()).unwrap_or_default();
    let parent = node
        .parent()
        .and_then(|p| p.attr("class"))
        .map(|c| c.to_string())
        .unwrap_or_default();

    for class in [own, parent] {
        let tokens: Vec<&str> = class.split_whitespace().collect();
        if tokens.iter().any(|t| matches!(*t, "items-end" | "justify-end" | "ml-auto")) {
            return Some(Role::User);
        }
        if tokens.iter().any(|t| matches!(*t, "items-start" | "justify-start" | "mr-auto")) {
            return Some(Role::Assistant);
        }
    }
    None
}

fn keyword_role(node: &NodeRef) -> Option<Role> {
    let mut hints = String::new();
    for attr in ["class", "data-testid"] {
        if let Some(value) = node.attr(attr) {
            hints.push_str(&value);
            hints.push(' ');
        }
    }
    if let Some(tag) = dom::node_tag(node) {
        hints.push_str(&tag);
    }
    if hints.trim().is_empty() {
        return None;
    }

    if TOOL_KEYWORD.is_match(&hints) {
        return Some(Role::Tool);
    }
    if SYSTEM_KEYWORD.is_match(&hints) {
        return Some(Role::System);
    }
    // A node hinting at both sides says nothing.
    match (USER_KEYWORD.is_match(&hints), ASSISTANT_KEYWORD.is_match(&hints)) {
        (true, false) => Some(Role::User),
        (false, true) => Some(Role::Assistant),
        _ => None,
    }
}

fn text_prefix_role(node: &NodeRef) -> Option<Role> {
    let text = node.text();
    let head: String = text.trim_start().chars().take(64).collect();
    if USER_TEXT_PREFIX.is_match(&head) {
        Some(Role::User)
    } else if ASSISTANT_TEXT_PREFIX.is_match(&head) {
        Some(Role::Assistant)
    } else {
        None
    }
}

/// Resolve every [`Role::Unknown`] in place.
///
/// Unknowns become `user`, `assistant`, `user`, ... in encounter order,
/// counting only the unknowns themselves. Already resolved roles are left
/// alone and do not shift the alternation.
pub fn apply_alternating_fallback(messages: &mut [ScrapedMessage]) {
    let mut next_is_user = true;
    for message in messages.iter_mut().filter(|m| m.role == Role::Unknown) {
        message.role = if next_is_user { Role::User } else { Role::Assistant };
        next_is_user = !next_is_user;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_of(html: &str, selector: &str, provider: Provider) -> Role {
        let doc = dom::parse(html);
        let sel = doc.select(selector);
        sel.nodes()
            .first()
            .map_or(Role::Unknown, |node| infer_role(node, provider))
    }

    #[test]
    fn test_explicit_attribute_wins() {
        let html = r#"<div class="turn user-turn" data-message-author-role="assistant">x</div>"#;
        assert_eq!(role_of(html, ".turn", Provider::ChatGpt), Role::Assistant);
    }

    #[test]
    fn test_explicit_attribute_on_descendant() {
        let html = r#"<article class="t"><div><div data-message-author-role="user">q</div></div></article>"#;
        assert_eq!(role_of(html, ".t", Provider::ChatGpt), Role::User);
    }

    #[test]
    fn test_streaming_attribute_means_assistant() {
        let html = r#"<div class="t"><div data-is-streaming="false">answer</div></div>"#;
        assert_eq!(role_of(html, ".t", Provider::Claude), Role::Assistant);
    }

    #[test]
    fn test_claude_user_message() {
        let html = r#"<div class="t"><div data-testid="user-message">q</div></div>"#;
        assert_eq!(role_of(html, ".t", Provider::Claude), Role::User);
    }

    #[test]
    fn test_gemini_tags() {
        let html = "<user-query>q</user-query><model-response>a</model-response>";
        assert_eq!(role_of(html, "user-query", Provider::Gemini), Role::User);
        assert_eq!(role_of(html, "model-response", Provider::Gemini), Role::Assistant);
    }

    #[test]
    fn test_grok_alignment() {
        let html = r#"<div class="flex items-end"><div class="message-bubble">q</div></div>
                      <div class="flex items-start"><div class="message-bubble answer">a</div></div>"#;
        let doc = dom::parse(html);
        let roles: Vec<Role> = doc
            .select(".message-bubble")
            .nodes()
            .iter()
            .map(|n| infer_role(n, Provider::Grok))
            .collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            role_of(r#"<div class="t human-turn">x</div>"#, ".t", Provider::ChatGpt),
            Role::User
        );
        assert_eq!(
            role_of(r#"<div class="t bot-reply">x</div>"#, ".t", Provider::ChatGpt),
            Role::Assistant
        );
        assert_eq!(
            role_of(r#"<div class="t" data-testid="tool-result">x</div>"#, ".t", Provider::ChatGpt),
            Role::Tool
        );
    }

    #[test]
    fn test_conflicting_keywords_fall_through_to_text() {
        let html = r#"<div class="t user-response">You said: hello</div>"#;
        assert_eq!(role_of(html, ".t", Provider::ChatGpt), Role::User);
    }

    #[test]
    fn test_text_prefix() {
        let html = r#"<div class="t">ChatGPT said: hi</div>"#;
        assert_eq!(role_of(html, ".t", Provider::ChatGpt), Role::Assistant);
        let html = r#"<div class="t">plain</div>"#;
        assert_eq!(role_of(html, ".t", Provider::ChatGpt), Role::Unknown);
    }

    #[test]
    fn test_alternating_fallback_is_independent_of_resolved_roles() {
        let mut messages = vec![
            ScrapedMessage::new(Role::Unknown, "a"),
            ScrapedMessage::new(Role::Assistant, "b"),
            ScrapedMessage::new(Role::Unknown, "c"),
        ];
        apply_alternating_fallback(&mut messages);
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Assistant]);
    }
}
