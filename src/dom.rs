//! DOM Operations Adapter
//!
//! Thin helpers over the `dom_query` crate plus the shadow-root aware tree
//! walk used by selector discovery and message extraction.
//!
//! ## Shadow roots
//!
//! Page snapshots inline every open shadow root as a `<share-shadow-root>`
//! element placed as the first child of its host:
//!
//! ```html
//! <model-response>
//!   <share-shadow-root><div class="markdown">...</div></share-shadow-root>
//!   <span slot="footer">light child</span>
//! </model-response>
//! ```
//!
//! [`ShadowTree`] exposes "children" and "shadow root if present" so the
//! collector can recurse into both explicitly.

// Re-export core types for external use
pub use dom_query::{Document, NodeRef, Selection};

/// Tag name of the inlined shadow-root wrapper in page snapshots.
pub const SHADOW_ROOT_TAG: &str = "share-shadow-root";

/// Tags treated as block-level when deciding whether bare `<code>` is a block.
pub const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "details", "dialog", "dd", "div",
    "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "header", "li", "main",
    "nav", "ol", "p", "section", "td", "th", "ul",
];

// === Attribute Operations ===

/// Get element class attribute
#[inline]
#[must_use]
pub fn class_name(sel: &Selection) -> Option<String> {
    sel.attr("class").map(|s| s.to_string())
}

/// Get any attribute value
#[inline]
#[must_use]
pub fn get_attribute(sel: &Selection, name: &str) -> Option<String> {
    sel.attr(name).map(|s| s.to_string())
}

// === Tag/Node Information ===

/// Get tag name (lowercase)
#[must_use]
pub fn tag_name(sel: &Selection) -> Option<String> {
    sel.nodes().first().and_then(node_tag)
}

/// Lowercase tag name of an element node.
#[must_use]
pub fn node_tag(node: &NodeRef) -> Option<String> {
    if !node.is_element() {
        return None;
    }
    node.node_name().map(|t| t.to_ascii_lowercase())
}

/// Whether the node is an element with one of the given tag names.
#[must_use]
pub fn is_one_of(node: &NodeRef, tags: &[&str]) -> bool {
    node_tag(node).is_some_and(|t| tags.contains(&t.as_str()))
}

// === Text Content ===

/// Text of a code container with `<br>` turned into newlines.
///
/// `dom_query`'s `text()` drops `<br>`, which some providers use inside
/// highlighted code instead of literal newlines.
#[must_use]
pub fn code_text(node: &NodeRef) -> String {
    let mut out = String::new();
    push_code_text(node, &mut out);
    out
}

fn push_code_text(node: &NodeRef, out: &mut String) {
    for child in node.children() {
        if child.is_text() {
            out.push_str(&child.text());
        } else if child.is_element() {
            if node_tag(&child).as_deref() == Some("br") {
                out.push('\n');
            } else {
                push_code_text(&child, out);
            }
        }
    }
}

// === Parsing ===

/// Parse HTML string into document
#[inline]
#[must_use]
pub fn parse(html: &str) -> Document {
    Document::from(html)
}

/// Parse an HTML fragment inside a wrapper `<div>` and return the document.
///
/// The wrapper keeps top-level text nodes and lets callers address the
/// fragment root with [`FRAGMENT_ROOT`].
#[must_use]
pub fn parse_fragment(html: &str) -> Document {
    Document::from(format!(r#"<div id="{FRAGMENT_ID}">{html}</div>"#))
}

const FRAGMENT_ID: &str = "share-fragment-root";

/// Selector addressing the wrapper created by [`parse_fragment`].
pub const FRAGMENT_ROOT: &str = "#share-fragment-root";

/// Whether `selector` parses as a CSS selector.
#[must_use]
pub fn is_valid_selector(selector: &str) -> bool {
    !selector.trim().is_empty() && dom_query::Matcher::new(selector).is_ok()
}

// === Shadow-root aware traversal ===

/// A tree whose elements may host a shadow root.
pub trait ShadowTree: Sized {
    /// Light-DOM element children, in order.
    fn element_children(&self) -> Vec<Self>;
    /// Shadow root hosted by this element, if any.
    fn shadow_root(&self) -> Option<Self>;
    /// Whether this element matches a CSS selector.
    fn matches(&self, selector: &str) -> bool;
}

impl<'a> ShadowTree for NodeRef<'a> {
    fn element_children(&self) -> Vec<Self> {
        self.children()
            .into_iter()
            .filter(|c| c.is_element() && !is_shadow_wrapper(c))
            .collect()
    }

    fn shadow_root(&self) -> Option<Self> {
        self.children().into_iter().find(is_shadow_wrapper)
    }

    fn matches(&self, selector: &str) -> bool {
        self.is_element() && !is_shadow_wrapper(self) && Selection::from(*self).is(selector)
    }
}

fn is_shadow_wrapper(node: &NodeRef) -> bool {
    node_tag(node).as_deref() == Some(SHADOW_ROOT_TAG)
}

/// Collect elements matching `selector` under `root`, descending into
/// shadow roots, in document order.
///
/// A match nested inside another match is not reported separately: the
/// outer element already carries its content.
#[must_use]
pub fn collect_matches<T: ShadowTree>(root: &T, selector: &str) -> Vec<T> {
    let mut out = Vec::new();
    collect_into(root, selector, &mut out);
    out
}

fn collect_into<T: ShadowTree>(node: &T, selector: &str, out: &mut Vec<T>) {
    if let Some(shadow) = node.shadow_root() {
        for child in shadow.element_children() {
            visit(child, selector, out);
        }
    }
    for child in node.element_children() {
        visit(child, selector, out);
    }
}

fn visit<T: ShadowTree>(node: T, selector: &str, out: &mut Vec<T>) {
    if node.matches(selector) {
        out.push(node);
    } else {
        collect_into(&node, selector, out);
    }
}

/// Number of matches [`collect_matches`] would return for a document.
#[must_use]
pub fn count_matches(doc: &Document, selector: &str) -> usize {
    collect_matches(&doc.root(), selector).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_matches_document_order() {
        let doc = parse(
            r#"<main>
                <div class="turn">1</div>
                <section><div class="turn">2</div></section>
                <div class="turn">3</div>
            </main>"#,
        );
        let found = collect_matches(&doc.root(), ".turn");
        let texts: Vec<String> = found.iter().map(|n| n.text().to_string()).collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_collect_matches_descends_into_shadow_roots() {
        let doc = parse(
            r#"<chat-app>
                <share-shadow-root>
                    <user-query>hello</user-query>
                    <model-response>
                        <share-shadow-root><div class="inner">deep</div></share-shadow-root>
                    </model-response>
                </share-shadow-root>
            </chat-app>"#,
        );
        assert_eq!(collect_matches(&doc.root(), "user-query").len(), 1);
        assert_eq!(collect_matches(&doc.root(), ".inner").len(), 1);
        assert_eq!(count_matches(&doc, "user-query, model-response"), 2);
    }

    #[test]
    fn test_nested_matches_are_reported_once() {
        let doc = parse(r#"<div class="m"><div class="m">inner</div></div><div class="m">b</div>"#);
        assert_eq!(count_matches(&doc, ".m"), 2);
    }

    #[test]
    fn test_shadow_wrapper_never_matches() {
        let doc = parse("<div><share-shadow-root><p>x</p></share-shadow-root></div>");
        assert_eq!(count_matches(&doc, "share-shadow-root"), 0);
        assert_eq!(count_matches(&doc, "p"), 1);
    }

    #[test]
    fn test_code_text_keeps_br_as_newline() {
        let doc = parse("<pre><code>a<br>b<span>c</span></code></pre>");
        let code = doc.select("code");
        let node = code.nodes().first().copied();
        assert_eq!(node.map(|n| code_text(&n)).as_deref(), Some("a\nbc"));
    }

    #[test]
    fn test_selector_validation() {
        assert!(is_valid_selector("div[data-message-author-role]"));
        assert!(!is_valid_selector("div[["));
        assert!(!is_valid_selector("  "));
    }

    #[test]
    fn test_parse_fragment_root() {
        let doc = parse_fragment("text <b>bold</b>");
        assert_eq!(doc.select(FRAGMENT_ROOT).text().to_string(), "text bold");
    }
}
