//! UI Chrome Rules
//!
//! Identifies interface elements inside a conversation turn (copy buttons,
//! tooltips, citation pills, feedback toolbars, screen-reader labels) that
//! must not reach the Markdown output.

use crate::selector::utils::{attr, class, class_testid, is_one_of_tags, tag};
use crate::selector::Rule;
use dom_query::Selection;

/// Elements removed outright, regardless of attributes.
pub const CHROME_TAGS: &[&str] = &[
    "button", "script", "style", "template", "noscript", "svg", "link", "meta", "form",
    "input", "textarea", "select",
];

/// UI chrome rules. An element matching any rule is removed with its subtree.
pub static UI_CHROME: &[Rule] = &[chrome_tag_rule, button_role_rule, widget_rule, sr_only_rule];

/// Rule 1: interactive and non-content tags.
#[must_use]
pub fn chrome_tag_rule(sel: &Selection) -> bool {
    is_one_of_tags(sel, CHROME_TAGS)
}

/// Rule 2: elements acting as buttons or toolbars.
#[must_use]
pub fn button_role_rule(sel: &Selection) -> bool {
    matches!(
        attr(sel, "role").to_ascii_lowercase().as_str(),
        "button" | "toolbar" | "tooltip" | "menu" | "menubar"
    )
}

/// Rule 3: copy buttons, tooltips, citations and feedback widgets by class
/// or test id.
#[must_use]
pub fn widget_rule(sel: &Selection) -> bool {
    // Spans and sups hold citation pills; anything else is only considered
    // when it is a generic container.
    if !matches!(tag(sel).as_str(), "div" | "span" | "sup" | "a" | "aside") {
        return false;
    }

    let hints = class_testid(sel);
    if hints.is_empty() {
        return false;
    }

    hints.contains("copy-button")
        || hints.contains("copy-code")
        || hints.contains("copy-turn")
        || hints.contains("tooltip")
        || hints.contains("citation")
        || hints.contains("source-footnote")
        || hints.contains("feedback")
        || hints.contains("thumbs")
        || hints.contains("message-actions")
        || hints.contains("response-actions")
        || hints.contains("action-bar")
        || hints.contains("edit-button")
        || hints.contains("regenerate")
        || (attr(sel, "data-state") == "closed" && hints.contains("popover"))
}

/// Rule 4: screen-reader-only labels ("You said:", "ChatGPT said:").
#[must_use]
pub fn sr_only_rule(sel: &Selection) -> bool {
    class(sel)
        .split_whitespace()
        .any(|c| c == "sr-only" || c == "visually-hidden" || c == "cdk-visually-hidden")
}

/// Check if an element is UI chrome.
#[must_use]
pub fn is_chrome(sel: &Selection) -> bool {
    UI_CHROME.iter().any(|rule| rule(sel))
}

/// Find all chrome elements under `root`, outermost first.
///
/// Descendants of an element already reported are skipped so callers can
/// remove the returned selections without touching detached nodes.
#[must_use]
pub fn find_chrome<'a>(root: &Selection<'a>) -> Vec<Selection<'a>> {
    let candidates = crate::selector::query_all(root, is_chrome);
    let mut outermost: Vec<Selection<'a>> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let nested = outermost.iter().any(|outer| {
            candidate
                .nodes()
                .first()
                .is_some_and(|node| outer.nodes().first().is_some_and(|o| is_ancestor(o, node)))
        });
        if !nested {
            outermost.push(candidate);
        }
    }
    outermost
}

fn is_ancestor(ancestor: &dom_query::NodeRef, node: &dom_query::NodeRef) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if parent.id == ancestor.id {
            return true;
        }
        current = parent.parent();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;

    #[test]
    fn test_buttons_and_roles_are_chrome() {
        let doc = dom::parse(r#"<div><button>Copy</button><div role="button">Edit</div><p>Body</p></div>"#);
        assert!(is_chrome(&doc.select("button")));
        assert!(is_chrome(&doc.select(r#"[role="button"]"#)));
        assert!(!is_chrome(&doc.select("p")));
    }

    #[test]
    fn test_widget_classes_are_chrome() {
        let doc = dom::parse(
            r#"<div>
                <span class="citation-pill">[1]</span>
                <div data-testid="copy-turn-action-button">Copy</div>
                <div class="markdown prose">Keep</div>
            </div>"#,
        );
        assert!(is_chrome(&doc.select(".citation-pill")));
        assert!(is_chrome(&doc.select("[data-testid]")));
        assert!(!is_chrome(&doc.select(".markdown")));
    }

    #[test]
    fn test_sr_only_is_chrome() {
        let doc = dom::parse(r#"<h5 class="sr-only">You said:</h5>"#);
        assert!(is_chrome(&doc.select("h5")));
    }

    #[test]
    fn test_find_chrome_skips_nested() {
        let doc = dom::parse(
            r#"<section><div class="message-actions"><button>Copy</button></div><p>x</p></section>"#,
        );
        let found = find_chrome(&doc.select("section"));
        assert_eq!(found.len(), 1);
        assert_eq!(tag(&found[0]), "div");
    }
}
