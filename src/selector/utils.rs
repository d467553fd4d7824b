//! Utility functions for selector rules
//!
//! Attribute access that returns empty strings instead of options, so rules
//! can chain `contains` checks without unwrapping.

use crate::dom;
use dom_query::Selection;

/// Get element class attribute (empty string if missing)
#[inline]
#[must_use]
pub fn class(sel: &Selection) -> String {
    dom::class_name(sel).unwrap_or_default()
}

/// Get any attribute (empty string if missing)
#[inline]
#[must_use]
pub fn attr(sel: &Selection, name: &str) -> String {
    dom::get_attribute(sel, name).unwrap_or_default()
}

/// Get tag name (empty string if missing)
#[inline]
#[must_use]
pub fn tag(sel: &Selection) -> String {
    dom::tag_name(sel).unwrap_or_default()
}

/// Lowercased `class` and `data-testid` joined by a space.
///
/// Providers put their semantic hints in either attribute, so keyword rules
/// look at both at once.
#[must_use]
pub fn class_testid(sel: &Selection) -> String {
    let mut combined = class(sel);
    let testid = attr(sel, "data-testid");
    if !testid.is_empty() {
        combined.push(' ');
        combined.push_str(&testid);
    }
    combined.to_lowercase()
}

/// Check if element is one of the specified tags
#[inline]
#[must_use]
pub fn is_one_of_tags(sel: &Selection, tags: &[&str]) -> bool {
    let t = tag(sel);
    tags.contains(&t.as_str())
}
