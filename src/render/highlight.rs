//! Syntax highlighting for fenced code blocks.
//!
//! Highlighting emits classed spans (`hl-` prefixed) so one stylesheet can
//! carry both the light and the dark palette.

use std::sync::LazyLock;

use syntect::highlighting::ThemeSet;
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use tracing::debug;

/// Class prefix of highlighted spans.
const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

const LIGHT_THEME: &str = "InspiredGitHub";
const DARK_THEME: &str = "base16-ocean.dark";

/// Label of blocks without a detected language.
pub const PLAIN_TEXT: &str = "text";

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Keyword hints tried when neither the info string nor the first line
/// names a language. Each entry needs two hits to win.
const KEYWORD_HINTS: &[(&str, &[&str])] = &[
    ("rs", &["fn ", "let mut ", "impl ", "pub ", "use std", "::", "-> ", "match "]),
    ("py", &["def ", "import ", "self.", "elif ", "print(", "None", "__init__"]),
    ("go", &["package ", "func ", ":= ", "fmt."]),
    ("java", &["public class", "System.out", "private ", "void "]),
    ("c", &["#include", "int main", "printf(", "->"]),
    ("js", &["function ", "const ", "=> ", "console.", "let ", "require("]),
    ("html", &["<div", "<html", "</", "<span", "<p>"]),
    ("sql", &["SELECT ", "FROM ", "WHERE ", "INSERT ", "JOIN "]),
    ("sh", &["$ ", "sudo ", "apt ", "npm ", "cargo ", "echo ", "export "]),
];

/// Stylesheet for highlighted spans: light palette by default, dark palette
/// under `prefers-color-scheme: dark`.
pub static HIGHLIGHT_CSS: LazyLock<String> = LazyLock::new(|| {
    let themes = ThemeSet::load_defaults();
    let css_for = |name: &str| {
        themes
            .themes
            .get(name)
            .and_then(|theme| css_for_theme_with_class_style(theme, CLASS_STYLE).ok())
            .unwrap_or_default()
    };
    format!(
        "{}\n@media (prefers-color-scheme: dark) {{\n{}\n}}\n",
        css_for(LIGHT_THEME),
        css_for(DARK_THEME)
    )
});

/// Pick a syntax for a code block and the label shown above it.
fn resolve_syntax(language: Option<&str>, code: &str) -> (&'static SyntaxReference, String) {
    let syntaxes = &*SYNTAXES;

    if let Some(token) = language.map(str::trim).filter(|t| !t.is_empty()) {
        if let Some(syntax) = syntaxes.find_syntax_by_token(token) {
            return (syntax, token.to_ascii_lowercase());
        }
        debug!(language = token, "unknown code language, detecting");
    }

    if let Some(syntax) = syntaxes.find_syntax_by_first_line(code) {
        return (syntax, syntax.name.to_ascii_lowercase());
    }

    if let Some(token) = keyword_guess(code) {
        if let Some(syntax) = syntaxes.find_syntax_by_token(token) {
            return (syntax, syntax.name.to_ascii_lowercase());
        }
    }

    (syntaxes.find_syntax_plain_text(), PLAIN_TEXT.to_string())
}

/// Token of the language whose keywords occur most, if any has two hits.
fn keyword_guess(code: &str) -> Option<&'static str> {
    let mut best: Option<(&'static str, usize)> = None;
    for &(token, keywords) in KEYWORD_HINTS {
        let hits = keywords.iter().filter(|k| code.contains(**k)).count();
        if hits >= 2 && best.is_none_or(|(_, top)| hits > top) {
            best = Some((token, hits));
        }
    }
    best.map(|(token, _)| token)
}

/// Highlighted `<pre>` block for `code`, wrapped in a labelled figure.
#[must_use]
pub fn code_block(code: &str, language: Option<&str>) -> String {
    let (syntax, label) = resolve_syntax(language, code);

    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAXES, CLASS_STYLE);
    let mut highlighted = true;
    for line in LinesWithEndings::from(code) {
        if generator.parse_html_for_line_which_includes_newline(line).is_err() {
            highlighted = false;
            break;
        }
    }
    let body = if highlighted {
        generator.finalize()
    } else {
        html_escape::encode_text(code).into_owned()
    };

    format!(
        "<figure class=\"code-block\"><figcaption class=\"code-lang\">{}</figcaption><pre class=\"hl-code\"><code class=\"language-{}\">{body}</code></pre></figure>\n",
        html_escape::encode_text(&label),
        html_escape::encode_double_quoted_attribute(&label)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_language_is_used() {
        let html = code_block("fn main() {}\n", Some("rust"));
        assert!(html.contains("<figcaption class=\"code-lang\">rust</figcaption>"));
        assert!(html.contains("hl-"));
    }

    #[test]
    fn test_first_line_detection() {
        let (syntax, _) = resolve_syntax(None, "#!/bin/bash\necho hi\n");
        assert!(syntax.name.contains("Bash") || syntax.name.contains("Shell"));
    }

    #[test]
    fn test_keyword_guess() {
        assert_eq!(keyword_guess("def f(self):\n    import os\n"), Some("py"));
        assert_eq!(keyword_guess("hello world"), None);
    }

    #[test]
    fn test_plain_text_fallback() {
        let html = code_block("just some words\n", None);
        assert!(html.contains(">text</figcaption>"));
        assert!(html.contains("just some words"));
    }

    #[test]
    fn test_code_is_escaped() {
        let html = code_block("<script>alert(1)</script>\n", Some("txt"));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn test_css_has_both_palettes() {
        assert!(HIGHLIGHT_CSS.contains("prefers-color-scheme: dark"));
        assert!(HIGHLIGHT_CSS.contains(".hl-"));
    }
}
