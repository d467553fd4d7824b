//! Per-message cleaning and code normalization.
//!
//! Works on a detached copy of the matched node's inner HTML, so the parsed
//! snapshot is never modified.

use dom_query::{NodeRef, Selection};

use crate::dom::{self, Document, BLOCK_TAGS, FRAGMENT_ROOT, SHADOW_ROOT_TAG};
use crate::patterns::LANGUAGE_CLASS;
use crate::selector::chrome;

/// Attributes stripped from every element.
const NOISE_ATTRIBUTES: &[&str] = &["data-start", "data-end"];

/// Bare `<code>` longer than this is treated as a block.
pub const BLOCK_CODE_CHARS: usize = 80;

/// Marks `<pre>` elements already rewritten during normalization.
const NORMALIZED_MARKER: &str = "data-share-normalized";

/// Cleaned inner HTML of a matched turn, or `None` when nothing with text
/// or an image is left.
#[must_use]
pub fn clean_message(node: &NodeRef) -> Option<String> {
    let inner = Selection::from(*node).inner_html();
    let doc = dom::parse_fragment(&inner);

    unwrap_shadow_roots(&doc);
    remove_chrome(&doc);
    normalize_pre_blocks(&doc);
    promote_block_code(&doc);

    let root = doc.select(FRAGMENT_ROOT);
    let has_text = !root.text().trim().is_empty();
    let has_image = root.select("img").exists();
    if !has_text && !has_image {
        return None;
    }
    Some(root.inner_html().trim().to_string())
}

/// Replace each `<share-shadow-root>` wrapper by its children.
fn unwrap_shadow_roots(doc: &Document) {
    // Each pass removes one wrapper; nested wrappers are counted up front.
    for _ in 0..doc.select(SHADOW_ROOT_TAG).length() {
        let wrapper = doc.select(SHADOW_ROOT_TAG).first();
        if !wrapper.exists() {
            break;
        }
        let inner = wrapper.inner_html();
        wrapper.replace_with_html(inner);
    }
}

fn remove_chrome(doc: &Document) {
    let root = doc.select(FRAGMENT_ROOT);
    for element in chrome::find_chrome(&root) {
        element.remove();
    }

    let selector = NOISE_ATTRIBUTES
        .iter()
        .map(|a| format!("[{a}]"))
        .collect::<Vec<_>>()
        .join(", ");
    let noisy = root.select(&selector);
    noisy.remove_attrs(NOISE_ATTRIBUTES);
}

/// Rewrite every `<pre>` as `<pre><code class="language-X">text</code></pre>`.
fn normalize_pre_blocks(doc: &Document) {
    let pending = format!("pre:not([{NORMALIZED_MARKER}])");
    for _ in 0..doc.select("pre").length() {
        let pre = doc.select(&pending).first();
        let Some(node) = pre.nodes().first().copied() else {
            break;
        };

        let code = pre.select("code").first();
        let text = match code.nodes().first() {
            Some(code_node) => dom::code_text(code_node),
            None => dom::code_text(&node),
        };
        let language = declared_language(&pre, &code).or_else(|| header_label(&node, &code));

        pre.replace_with_html(code_block_html(&text, language.as_deref(), true));
    }

    doc.select(&format!("[{NORMALIZED_MARKER}]"))
        .remove_attr(NORMALIZED_MARKER);
}

/// Turn bare `<code>` that looks like a block into `pre > code`.
fn promote_block_code(doc: &Document) {
    let candidates: Vec<NodeRef> = doc
        .select(&format!("{FRAGMENT_ROOT} code"))
        .nodes()
        .iter()
        .copied()
        .filter(|code| !has_ancestor(code, "pre"))
        .collect();

    for code in candidates {
        let text = dom::code_text(&code);
        if !looks_like_block(&code, &text) {
            continue;
        }
        let sel = Selection::from(code);
        let language = declared_language(&sel, &sel);
        sel.replace_with_html(code_block_html(&text, language.as_deref(), false));
    }
}

/// Whether a bare `<code>` is a code block rendered without `<pre>`.
///
/// True when the text spans lines, exceeds [`BLOCK_CODE_CHARS`], or the
/// element is the only content of a block-level parent.
#[must_use]
pub fn looks_like_block(code: &NodeRef, text: &str) -> bool {
    if text.contains('\n') || text.chars().count() > BLOCK_CODE_CHARS {
        return true;
    }

    // Sole content of a block-level parent.
    let Some(parent) = code.parent() else {
        return false;
    };
    if !dom::is_one_of(&parent, BLOCK_TAGS) {
        return false;
    }
    parent.children().iter().all(|sibling| {
        sibling.id == code.id
            || (sibling.is_text() && sibling.text().trim().is_empty())
            || (!sibling.is_text() && !sibling.is_element())
    })
}

fn has_ancestor(node: &NodeRef, tag: &str) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if dom::node_tag(&parent).as_deref() == Some(tag) {
            return true;
        }
        current = parent.parent();
    }
    false
}

/// Language from `class="language-X"`, `lang-X` or `data-language`.
fn declared_language(pre: &Selection, code: &Selection) -> Option<String> {
    for sel in [code, pre] {
        if let Some(class) = dom::class_name(sel) {
            if let Some(caps) = LANGUAGE_CLASS.captures(&class) {
                return Some(caps[1].to_ascii_lowercase());
            }
        }
        for attr in ["data-language", "data-lang"] {
            if let Some(value) = dom::get_attribute(sel, attr) {
                let value = value.trim().to_ascii_lowercase();
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// Language label some providers render in a header row inside `<pre>`.
///
/// Whatever text of the `<pre>` is not code is taken as the label when it
/// is a single short token.
fn header_label(pre: &NodeRef, code: &Selection) -> Option<String> {
    if !code.exists() {
        return None;
    }
    let all = pre.text();
    let code_text = code.text();
    let label = all.replacen(&*code_text, "", 1);
    let label = label.trim();
    let plausible = !label.is_empty()
        && label.len() <= 20
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '-' | '.' | '_'));
    plausible.then(|| label.to_ascii_lowercase())
}

fn code_block_html(text: &str, language: Option<&str>, mark: bool) -> String {
    let marker = if mark {
        format!(r#" {NORMALIZED_MARKER}="""#)
    } else {
        String::new()
    };
    let class = language
        .filter(|l| !l.is_empty())
        .map(|l| format!(r#" class="language-{}""#, html_escape::encode_double_quoted_attribute(l)))
        .unwrap_or_default();
    format!(
        "<pre{marker}><code{class}>{}</code></pre>",
        html_escape::encode_text(text)
    )
}
