//! Selector Infrastructure
//!
//! Two kinds of selectors live here:
//!
//! - [`SelectorGroup`]s: CSS hypotheses about where conversation turns sit
//!   in a provider's DOM, organised per provider in [`catalog`] and chosen
//!   at runtime by [`discovery`].
//! - [`Rule`]s: predicate functions over a [`Selection`], used by the
//!   extractor to spot UI chrome that CSS alone cannot express
//!   (see [`chrome`]).

use dom_query::Selection;

pub mod catalog;
pub mod chrome;
pub mod discovery;
pub mod utils;

pub use catalog::catalog;
pub use discovery::{discover, discover_in_document, SelectorChoice};

/// One hypothesis about the DOM shape of a provider's share page.
///
/// A group matches a node if any of its selectors matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorGroup {
    /// Stable identifier used in logs and stage traces.
    pub name: &'static str,
    /// Selectors tried together.
    pub selectors: &'static [&'static str],
}

impl SelectorGroup {
    #[must_use]
    pub const fn new(name: &'static str, selectors: &'static [&'static str]) -> Self {
        Self { name, selectors }
    }

    /// Comma-joined selector list, usable with `querySelectorAll`.
    #[must_use]
    pub fn combined(&self) -> String {
        self.selectors.join(", ")
    }
}

/// A selector rule that tests if a selection matches certain criteria
///
/// Rules are simple predicate functions used by the cleaning pass to
/// identify UI chrome inside a conversation turn.
pub type Rule = fn(&Selection) -> bool;

/// Query for all elements matching the rule
///
/// Iterates through all descendants in document order and collects all
/// elements for which the rule returns true.
#[must_use]
pub fn query_all<'a>(root: &Selection<'a>, rule: Rule) -> Vec<Selection<'a>> {
    let mut matches = Vec::new();

    for node in root.select("*").nodes() {
        let sel = Selection::from(*node);
        if rule(&sel) {
            matches.push(sel);
        }
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;

    fn is_target(sel: &Selection) -> bool {
        utils::class(sel).contains("target")
    }

    #[test]
    fn test_query_all_preserves_document_order() {
        let doc = dom::parse(
            r#"
            <div>
                <p class="target">1</p>
                <section><p class="target">2</p></section>
                <span>skip</span>
                <p class="target">3</p>
            </div>
        "#,
        );
        let root = doc.select("div");

        let texts: Vec<String> = query_all(&root, is_target)
            .iter()
            .map(|s| s.text().to_string())
            .collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_query_all_empty_when_no_match() {
        let doc = dom::parse("<div><p>content</p></div>");
        assert!(query_all(&doc.select("div"), is_target).is_empty());
    }

    #[test]
    fn test_group_combined_selector() {
        const GROUP: SelectorGroup = SelectorGroup::new("g", &["user-query", "model-response"]);
        assert_eq!(GROUP.combined(), "user-query, model-response");
    }
}
