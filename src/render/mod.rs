//! Standalone HTML rendering of conversation Markdown.
//!
//! The output is a single self-contained page: inline CSS, no external
//! resources, no scripts, no event handlers. Rendering is deterministic, so
//! the same Markdown and metadata always produce the same bytes.
//!
//! Raw HTML in the Markdown never reaches the page as markup. It is turned
//! into text while parsing, and the rendered body is scanned once more for
//! `<script`/`<style` before it is embedded.

pub mod highlight;
pub mod style;

use std::collections::HashSet;

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::markdown::conversation_markdown;
use crate::patterns::{ACTIVE_TAG, SLUG_STRIP};
use crate::result::{ExtractionResult, RenderedDocument};

/// Slug used for headings without any word characters.
pub const EMPTY_SLUG: &str = "section";

/// Page-level metadata shown above the conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMeta {
    pub title: String,
    pub source_url: Option<String>,
    /// ISO-8601 retrieval timestamp.
    pub retrieved_at: Option<String>,
}

impl DocumentMeta {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_source(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_retrieved_at(mut self, at: impl Into<String>) -> Self {
        self.retrieved_at = Some(at.into());
        self
    }
}

/// Table of contents entry for an `h2`–`h4` heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub level: u8,
    pub id: String,
    pub text: String,
}

/// Render the Markdown and the standalone HTML page of a conversation.
#[must_use]
pub fn render_document(result: &ExtractionResult, source_url: &str) -> RenderedDocument {
    let markdown = conversation_markdown(result, source_url);
    let meta = DocumentMeta::new(result.title())
        .with_source(source_url)
        .with_retrieved_at(result.retrieved_at_iso());
    let html = render_html(&markdown, &meta);
    RenderedDocument { markdown, html }
}

/// Render Markdown into a complete HTML page.
///
/// # Example
///
/// ```rust
/// use share_scribe::render::{render_html, DocumentMeta};
///
/// let html = render_html("## Hi <script>x</script>\n\ntext", &DocumentMeta::new("Demo"));
/// assert!(html.contains(r#"<h2 id="hi-scriptxscript">"#));
/// assert!(!html.to_ascii_lowercase().contains("<script"));
/// ```
#[must_use]
pub fn render_html(markdown: &str, meta: &DocumentMeta) -> String {
    let (body, toc) = render_body(markdown);
    let body = neutralize_active_tags(&body);

    let mut page = String::with_capacity(body.len() + style::STYLESHEET.len() + 1024);
    page.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    page.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    page.push_str(
        "<meta http-equiv=\"Content-Security-Policy\" content=\"default-src 'none'; style-src 'unsafe-inline'; img-src https: http: data:\">\n",
    );
    page.push_str(&format!("<title>{}</title>\n", html_escape::encode_text(meta.title.trim())));
    page.push_str("<style>\n");
    page.push_str(&style::STYLESHEET);
    page.push_str("\n</style>\n</head>\n<body>\n<main class=\"document\">\n");

    page.push_str(&meta_header(meta));
    page.push_str(&toc_html(&toc));
    page.push_str("<article>\n");
    page.push_str(&body);
    page.push_str("</article>\n</main>\n</body>\n</html>\n");
    page
}

fn meta_header(meta: &DocumentMeta) -> String {
    let mut header = String::new();
    if let Some(url) = meta.source_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        header.push_str(&format!(
            "<p class=\"source\">Source: <a href=\"{}\" rel=\"noopener noreferrer\">{}</a></p>\n",
            html_escape::encode_double_quoted_attribute(&*safe_url(CowStr::Borrowed(url))),
            html_escape::encode_text(url)
        ));
    }
    if let Some(at) = meta.retrieved_at.as_deref() {
        header.push_str(&format!(
            "<p class=\"retrieved\">Retrieved: <time>{}</time></p>\n",
            html_escape::encode_text(at)
        ));
    }
    if header.is_empty() {
        return header;
    }
    format!("<header class=\"meta\">\n{header}</header>\n")
}

fn toc_html(toc: &[TocEntry]) -> String {
    if toc.is_empty() {
        return String::new();
    }
    let mut out = String::from("<nav class=\"toc\">\n<p class=\"toc-title\">Contents</p>\n<ul>\n");
    for entry in toc {
        out.push_str(&format!(
            "<li class=\"toc-h{}\"><a href=\"#{}\">{}</a></li>\n",
            entry.level,
            entry.id,
            html_escape::encode_text(&entry.text)
        ));
    }
    out.push_str("</ul>\n</nav>\n");
    out
}

fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Render the article body and collect the table of contents.
fn render_body(markdown: &str) -> (String, Vec<TocEntry>) {
    let mut slugs = SlugRegistry::default();
    let mut toc = Vec::new();
    let mut events: Vec<Event<'_>> = Vec::new();

    let mut parser = Parser::new_ext(markdown, parser_options());
    while let Some(event) = parser.next() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                let inner: Vec<Event<'_>> = parser
                    .by_ref()
                    .take_while(|e| !matches!(e, Event::End(TagEnd::Heading(_))))
                    .map(sanitize)
                    .collect();
                let text = plain_text(&inner);
                let id = slugs.claim(&text);
                let number = heading_number(level);
                if (2..=4).contains(&number) {
                    toc.push(TocEntry {
                        level: number,
                        id: id.clone(),
                        text: text.trim().to_string(),
                    });
                }

                let mut inner_html = String::new();
                html::push_html(&mut inner_html, inner.into_iter());
                events.push(Event::Html(CowStr::from(format!(
                    "<h{number} id=\"{id}\">{inner_html}</h{number}>\n"
                ))));
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                let mut code = String::new();
                for inner in parser.by_ref() {
                    match inner {
                        Event::End(TagEnd::CodeBlock) => break,
                        Event::Text(text) => code.push_str(&text),
                        _ => {}
                    }
                }
                events.push(Event::Html(CowStr::from(highlight::code_block(
                    &code,
                    language.as_deref(),
                ))));
            }
            other => events.push(sanitize(other)),
        }
    }

    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut body, events.into_iter());
    (body, toc)
}

/// Raw HTML becomes text; script URLs become `#`.
fn sanitize(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let scheme: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    if ["javascript:", "vbscript:", "data:text/html"]
        .iter()
        .any(|bad| scheme.starts_with(bad))
    {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

fn plain_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

const fn heading_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Escape any `<script`/`<style` that survived rendering.
fn neutralize_active_tags(html: &str) -> String {
    ACTIVE_TAG.replace_all(html, "&lt;$1$2").into_owned()
}

/// Hands out unique heading ids in document order.
#[derive(Debug, Default)]
struct SlugRegistry {
    used: HashSet<String>,
}

impl SlugRegistry {
    fn claim(&mut self, text: &str) -> String {
        let base = slugify(text);
        let mut candidate = base.clone();
        let mut n = 0;
        while self.used.contains(&candidate) {
            n += 1;
            candidate = format!("{base}-{n}");
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Lowercase, strip non-word characters, join words with hyphens.
#[must_use]
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = SLUG_STRIP.replace_all(&lower, "");
    let slug = stripped.split_whitespace().collect::<Vec<_>>().join("-");
    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust & C++ "), "rust-c");
        assert_eq!(slugify("!!!"), EMPTY_SLUG);
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
    }

    #[test]
    fn test_duplicate_headings_get_suffixes() {
        let (body, toc) = render_body("## User\n\na\n\n## Assistant\n\nb\n\n## User\n\nc\n\n## User\n");
        assert!(body.contains(r#"<h2 id="user">User</h2>"#));
        assert!(body.contains(r#"<h2 id="user-1">User</h2>"#));
        assert!(body.contains(r#"<h2 id="user-2">User</h2>"#));
        let ids: Vec<&str> = toc.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["user", "assistant", "user-1", "user-2"]);
    }

    #[test]
    fn test_toc_levels() {
        let (_, toc) = render_body("# Title\n\n## A\n\n### B\n\n#### C\n\n##### D\n");
        let levels: Vec<u8> = toc.iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![2, 3, 4]);
    }

    #[test]
    fn test_raw_html_is_text() {
        let (body, _) = render_body("<div onclick=\"x()\">hi</div>\n\ntext <b>bold</b>\n");
        assert!(!body.contains("<div"));
        assert!(!body.contains("<b>"));
        assert!(body.contains("&lt;b&gt;bold&lt;/b&gt;"));
    }

    #[test]
    fn test_script_links_are_neutralized() {
        let (body, _) = render_body("[x](javascript:alert(1)) ![i](JavaScript:void(0))");
        assert!(!body.to_ascii_lowercase().contains("javascript:"));
        assert!(body.contains(r##"href="#""##));
    }

    #[test]
    fn test_code_blocks_are_highlighted() {
        let (body, _) = render_body("```python\nprint('hi')\n```\n");
        assert!(body.contains("figure class=\"code-block\""));
        assert!(body.contains(">python</figcaption>"));
    }

    #[test]
    fn test_neutralize_active_tags() {
        assert_eq!(neutralize_active_tags("<SCRIPT>a</script><style>"), "&lt;SCRIPT>a&lt;/script>&lt;style>");
    }

    #[test]
    fn test_meta_header() {
        let meta = DocumentMeta::new("T")
            .with_source("https://chatgpt.com/share/x?a=1&b=2")
            .with_retrieved_at("2026-01-02T03:04:05Z");
        let html = render_html("# T\n", &meta);
        assert!(html.contains("href=\"https://chatgpt.com/share/x?a=1&amp;b=2\""));
        assert!(html.contains("<time>2026-01-02T03:04:05Z</time>"));
        assert!(html.contains("<title>T</title>"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let md = "# T\n\n## User\n\n```\nx = 1\n```\n\n| a | b |\n| - | - |\n| 1 | 2 |\n";
        let meta = DocumentMeta::new("T");
        assert_eq!(render_html(md, &meta), render_html(md, &meta));
    }
}
