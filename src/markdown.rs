//! HTML to Markdown conversion.
//!
//! A rule-based transducer over the cleaned message HTML. Block elements
//! are separated by blank lines, code blocks become fences that can never
//! be closed by their own content, and tables become GFM pipe tables.
//!
//! The converter walks the tree once, appending to a buffer. Constructs that
//! prefix their lines (list items, block quotes) render their children into
//! a nested buffer first.

use dom_query::{NodeRef, Selection};

use crate::dom;
use crate::extractor::clean::looks_like_block;
use crate::patterns::{LANGUAGE_CLASS, WHITESPACE_RUN};
use crate::result::ExtractionResult;

/// Characters that have special meaning in Markdown and need escaping.
const MARKDOWN_SPECIAL_CHARS: &[char] = &['\\', '`', '*', '_', '[', ']', '<', '>'];

/// Containers rendered as blank-line separated blocks.
const BLOCK_CONTAINERS: &[&str] = &[
    "div", "section", "article", "main", "header", "footer", "aside", "figure", "figcaption",
    "nav", "details", "summary", "address", "body", "html", "dl", "dt", "dd", "center",
];

/// Elements whose content never reaches the output.
const SKIPPED: &[&str] = &[
    "script", "style", "template", "noscript", "button", "svg", "head", "title", "meta", "link",
    "input", "textarea", "select",
];

/// Shortest code fence.
const MIN_FENCE: usize = 3;

/// Escape Markdown special characters in text content.
///
/// # Arguments
///
/// * `text` - The text content to escape
/// * `in_code_block` - If true, skip escaping (code blocks preserve literal content)
///
/// # Examples
///
/// ```
/// use share_scribe::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("*not italic*", false), r"\*not italic\*");
/// assert_eq!(escape_markdown("my_variable_name", false), r"my\_variable\_name");
/// assert_eq!(escape_markdown("*text*", true), "*text*");
/// ```
#[must_use]
pub fn escape_markdown(text: &str, in_code_block: bool) -> String {
    if in_code_block || text.is_empty() {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len() + text.len() / 4);

    for ch in text.chars() {
        if MARKDOWN_SPECIAL_CHARS.contains(&ch) {
            result.push('\\');
        }
        result.push(ch);
    }

    result
}

/// Convert an HTML fragment to Markdown.
///
/// # Example
///
/// ```rust
/// use share_scribe::markdown::html_to_markdown;
///
/// let md = html_to_markdown(r#"<p>Use <code>cargo</code>:</p><pre><code class="language-sh">cargo build</code></pre>"#);
/// assert_eq!(md, "Use `cargo`:\n\n```sh\ncargo build\n```");
/// ```
#[must_use]
pub fn html_to_markdown(html: &str) -> String {
    let doc = dom::parse_fragment(html);
    let root = doc.select(dom::FRAGMENT_ROOT);
    let mut converter = Converter::default();
    if let Some(node) = root.nodes().first() {
        converter.children(node);
    }
    finish(&converter.out)
}

/// Longest run of consecutive backticks in `text`.
#[must_use]
pub fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in text.chars() {
        if ch == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Fence that cannot occur inside `code`.
#[must_use]
pub fn fence_for(code: &str) -> String {
    "`".repeat(MIN_FENCE.max(longest_backtick_run(code) + 1))
}

/// Fenced code block for `code`, with non-breaking spaces normalized and
/// trailing whitespace trimmed.
///
/// # Example
///
/// ```rust
/// use share_scribe::markdown::fenced_block;
///
/// let block = fenced_block("x = '```'", Some("python"));
/// assert_eq!(block, "````python\nx = '```'\n````");
/// ```
#[must_use]
pub fn fenced_block(code: &str, language: Option<&str>) -> String {
    let code = code.replace('\u{a0}', " ");
    let code = code.trim_end();
    let fence = fence_for(code);
    let info = language.map(str::trim).unwrap_or_default();
    format!("{fence}{info}\n{code}\n{fence}")
}

/// Number of fence marker lines (openers and closers) in `markdown`.
///
/// A well-formed document always yields an even count.
#[must_use]
pub fn count_fences(markdown: &str) -> usize {
    let mut tracker = FenceTracker::default();
    markdown
        .lines()
        .filter(|line| tracker.observe(line) != LineKind::Text)
        .count()
}

/// Assemble the Markdown document for a conversation.
///
/// ```text
/// # Title
///
/// - Source: <https://...>
/// - Retrieved: 2026-01-02T03:04:05Z
///
/// ## User
///
/// ...
/// ```
#[must_use]
pub fn conversation_markdown(result: &ExtractionResult, source_url: &str) -> String {
    let mut doc = format!(
        "# {}\n\n- Source: <{}>\n- Retrieved: {}\n",
        escape_markdown(result.title().trim(), false),
        source_url.trim(),
        result.retrieved_at_iso()
    );
    for message in result.messages() {
        doc.push_str("\n## ");
        doc.push_str(message.role.label());
        doc.push_str("\n\n");
        doc.push_str(&html_to_markdown(&message.html));
        doc.push('\n');
    }
    finish(&doc) + "\n"
}

// === Converter ===

#[derive(Default)]
struct Converter {
    out: String,
}

impl Converter {
    fn render_children(node: &NodeRef) -> String {
        let mut nested = Self::default();
        nested.children(node);
        nested.out
    }

    fn children(&mut self, node: &NodeRef) {
        for child in node.children() {
            self.node(&child);
        }
    }

    fn node(&mut self, node: &NodeRef) {
        if node.is_text() {
            self.text(&node.text());
            return;
        }
        let Some(tag) = dom::node_tag(node) else {
            return;
        };

        match tag.as_str() {
            t if SKIPPED.contains(&t) => {}
            "p" => {
                self.block_break();
                self.children(node);
                self.block_break();
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => self.heading(node, &tag),
            "br" => self.line_break(),
            "hr" => {
                self.block_break();
                self.out.push_str("---");
                self.block_break();
            }
            "blockquote" => self.blockquote(node),
            "ul" | "ol" => self.list(node, tag == "ol"),
            "li" => self.list_item(node, "- "),
            "pre" => self.pre(node),
            "code" => self.code(node),
            "table" => {
                self.block_break();
                self.out.push_str(&table_to_markdown(&Selection::from(*node)));
                self.block_break();
            }
            "strong" | "b" => self.wrap(node, "**"),
            "em" | "i" => self.wrap(node, "*"),
            "del" | "s" | "strike" => self.wrap(node, "~~"),
            "a" => self.link(node),
            "img" => self.image(node),
            t if BLOCK_CONTAINERS.contains(&t) => {
                self.block_break();
                self.children(node);
                self.block_break();
            }
            _ => self.children(node),
        }
    }

    fn text(&mut self, raw: &str) {
        let collapsed = WHITESPACE_RUN.replace_all(raw, " ");
        let text = if self.at_line_start() {
            collapsed.trim_start()
        } else {
            &collapsed
        };
        if text.is_empty() {
            return;
        }
        let escaped = escape_markdown(text, false);
        if self.at_block_start() {
            self.out.push_str(&escape_block_start(&escaped));
        } else {
            self.out.push_str(&escaped);
        }
    }

    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n') || self.out.ends_with(' ')
    }

    /// Start of an output line, where text could open a block construct.
    fn at_block_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    /// Emit already rendered block content without an inline wrapper.
    fn push_blocks(&mut self, rendered: &str) {
        self.block_break();
        self.out.push_str(rendered.trim());
        self.block_break();
    }

    fn trim_trailing_spaces(&mut self) {
        let kept = self.out.trim_end_matches([' ', '\t']).len();
        self.out.truncate(kept);
    }

    fn line_break(&mut self) {
        self.trim_trailing_spaces();
        self.out.push('\n');
    }

    fn block_break(&mut self) {
        self.trim_trailing_spaces();
        if self.out.is_empty() {
            return;
        }
        let newlines = self.out.len() - self.out.trim_end_matches('\n').len();
        for _ in newlines..2 {
            self.out.push('\n');
        }
    }

    fn heading(&mut self, node: &NodeRef, tag: &str) {
        let level = tag[1..].parse::<usize>().unwrap_or(1);
        let text = Self::render_children(node).replace('\n', " ");
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.block_break();
        self.out.push_str(&"#".repeat(level));
        self.out.push(' ');
        self.out.push_str(text);
        self.block_break();
    }

    fn blockquote(&mut self, node: &NodeRef) {
        let inner = finish(&Self::render_children(node));
        if inner.is_empty() {
            return;
        }
        self.block_break();
        let quoted: Vec<String> = inner
            .lines()
            .map(|line| if line.is_empty() { ">".to_string() } else { format!("> {line}") })
            .collect();
        self.out.push_str(&quoted.join("\n"));
        self.block_break();
    }

    fn list(&mut self, node: &NodeRef, ordered: bool) {
        let mut number = Selection::from(*node)
            .attr("start")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1);

        let mut items = Vec::new();
        for child in node.children() {
            if dom::node_tag(&child).as_deref() != Some("li") {
                continue;
            }
            let marker = if ordered {
                let marker = format!("{number}. ");
                number += 1;
                marker
            } else {
                "- ".to_string()
            };
            items.push(render_list_item(&child, &marker));
        }
        if items.is_empty() {
            return;
        }

        self.block_break();
        self.out.push_str(&items.join("\n"));
        self.block_break();
    }

    /// `<li>` outside a list.
    fn list_item(&mut self, node: &NodeRef, marker: &str) {
        self.block_break();
        self.out.push_str(&render_list_item(node, marker));
        self.block_break();
    }

    fn pre(&mut self, node: &NodeRef) {
        let sel = Selection::from(*node);
        let code = sel.select("code").first();
        let (text, language) = match code.nodes().first() {
            Some(code_node) => (dom::code_text(code_node), language_of(&code).or_else(|| language_of(&sel))),
            None => (dom::code_text(node), language_of(&sel)),
        };
        self.block_break();
        self.out.push_str(&fenced_block(&text, language.as_deref()));
        self.block_break();
    }

    fn code(&mut self, node: &NodeRef) {
        let text = dom::code_text(node);
        if looks_like_block(node, &text) {
            self.block_break();
            self.out
                .push_str(&fenced_block(&text, language_of(&Selection::from(*node)).as_deref()));
            self.block_break();
            return;
        }

        let text = text.replace('\u{a0}', " ").replace('\n', " ");
        if text.trim().is_empty() {
            return;
        }
        let ticks = "`".repeat(longest_backtick_run(&text) + 1);
        let pad = if text.starts_with('`') || text.ends_with('`') { " " } else { "" };
        self.out.push_str(&format!("{ticks}{pad}{text}{pad}{ticks}"));
    }

    fn wrap(&mut self, node: &NodeRef, marker: &str) {
        let inner = Self::render_children(node);
        if holds_blocks(&inner) {
            self.push_blocks(&inner);
            return;
        }
        let trimmed = inner.trim();
        if trimmed.is_empty() {
            if !inner.is_empty() && !self.at_line_start() {
                self.out.push(' ');
            }
            return;
        }
        if inner.starts_with(char::is_whitespace) && !self.at_line_start() {
            self.out.push(' ');
        }
        self.out.push_str(marker);
        self.out.push_str(trimmed);
        self.out.push_str(marker);
        if inner.ends_with(char::is_whitespace) {
            self.out.push(' ');
        }
    }

    fn link(&mut self, node: &NodeRef) {
        let inner = Self::render_children(node);
        let text = inner.trim();
        let href = node.attr("href").map(|h| h.trim().to_string()).unwrap_or_default();

        if holds_blocks(&inner) {
            self.push_blocks(&inner);
            if is_safe_destination(&href) {
                let label = escape_markdown(&href, false);
                self.out.push_str(&format!("[{label}]({})", encode_destination(&href)));
                self.block_break();
            }
            return;
        }
        if !is_safe_destination(&href) {
            if !text.is_empty() {
                self.out.push_str(text);
            }
            return;
        }
        let label = if text.is_empty() {
            escape_markdown(&href, false)
        } else {
            text.to_string()
        };
        if inner.starts_with(char::is_whitespace) && !self.at_line_start() {
            self.out.push(' ');
        }
        self.out.push_str(&format!("[{label}]({})", encode_destination(&href)));
        if inner.ends_with(char::is_whitespace) {
            self.out.push(' ');
        }
    }

    fn image(&mut self, node: &NodeRef) {
        let src = node.attr("src").map(|s| s.trim().to_string()).unwrap_or_default();
        if !is_safe_destination(&src) {
            return;
        }
        let alt = node.attr("alt").map(|a| a.to_string()).unwrap_or_default();
        let alt = escape_markdown(WHITESPACE_RUN.replace_all(alt.trim(), " ").as_ref(), false);
        self.out.push_str(&format!("![{alt}]({})", encode_destination(&src)));
    }
}

/// Whether rendered inline content contains paragraphs or fenced code,
/// which emphasis and link markers cannot wrap.
fn holds_blocks(rendered: &str) -> bool {
    rendered.trim().contains("\n\n") || count_fences(rendered) > 0
}

/// Escape a leading character that would open a block construct: ATX
/// headings, tilde fences, list items, thematic breaks, setext underlines.
fn escape_block_start(text: &str) -> String {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let rest = chars.as_str();

    let opens_block = match first {
        '#' | '=' => true,
        '~' => rest.starts_with("~~"),
        '-' => rest.is_empty() || rest.starts_with([' ', '-']),
        '+' => rest.is_empty() || rest.starts_with(' '),
        '0'..='9' => {
            let digits = text.bytes().take_while(|b| b.is_ascii_digit()).count();
            let after = &text[digits..];
            let is_marker = digits <= 9
                && (after.starts_with(". ") || after.starts_with(") ") || after == "." || after == ")");
            if is_marker {
                return format!("{}\\{after}", &text[..digits]);
            }
            false
        }
        _ => false,
    };

    if opens_block {
        format!("\\{text}")
    } else {
        text.to_string()
    }
}

fn render_list_item(node: &NodeRef, marker: &str) -> String {
    let mut content = finish(&Converter::render_children(node));
    let sel = Selection::from(*node);
    // Items without paragraphs or code stay tight.
    if !sel.select("p, pre").exists() {
        while content.contains("\n\n") {
            content = content.replace("\n\n", "\n");
        }
    }

    let indent = " ".repeat(marker.len());
    let mut lines = content.lines();
    let mut item = format!("{marker}{}", lines.next().unwrap_or_default());
    for line in lines {
        item.push('\n');
        if !line.is_empty() {
            item.push_str(&indent);
            item.push_str(line);
        }
    }
    item.trim_end().to_string()
}

fn language_of(sel: &Selection) -> Option<String> {
    let class = dom::class_name(sel)?;
    LANGUAGE_CLASS
        .captures(&class)
        .map(|caps| caps[1].to_ascii_lowercase())
}

fn is_safe_destination(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    !lower.is_empty() && !lower.starts_with("javascript:") && !lower.starts_with("vbscript:")
}

fn encode_destination(url: &str) -> String {
    url.replace(' ', "%20").replace('(', "%28").replace(')', "%29")
}

// === Tables ===

/// Convert a `<table>` to a GFM pipe table.
///
/// The first row becomes the header and a separator row of dashes is
/// synthesized below it. Cell text is whitespace-collapsed and pipes are
/// escaped.
///
/// # Output Format
///
/// ```text
/// | Header A | Header B |
/// | -------- | -------- |
/// | Cell 1   | Cell 2   |
/// ```
#[must_use]
pub fn html_table_to_markdown(table_html: &str) -> String {
    let doc = dom::parse(table_html);
    table_to_markdown(&doc.select("table").first())
}

fn table_to_markdown(table: &Selection) -> String {
    let Some(table_node) = table.nodes().first().copied() else {
        return String::new();
    };

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut alignments: Vec<Alignment> = Vec::new();

    for tr in table.select("tr").nodes() {
        if closest_table(tr).is_some_and(|t| t.id != table_node.id) {
            continue;
        }
        let mut row = Vec::new();
        for cell in tr.children() {
            if !dom::is_one_of(&cell, &["td", "th"]) {
                continue;
            }
            if rows.is_empty() {
                alignments.push(
                    cell.attr("align")
                        .map_or(Alignment::None, |a| Alignment::from_str(&a)),
                );
            }
            row.push(cell_text(&cell));
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }

    if rows.is_empty() {
        return String::new();
    }

    // Calculate column widths
    let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut col_widths: Vec<usize> = vec![3; col_count];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            col_widths[i] = col_widths[i].max(cell.chars().count());
        }
    }
    alignments.resize(col_count, Alignment::None);

    let mut output = String::new();
    for (row_idx, row) in rows.iter().enumerate() {
        output.push('|');
        for (col_idx, width) in col_widths.iter().enumerate() {
            let cell = row.get(col_idx).map_or("", String::as_str);
            output.push(' ');
            output.push_str(&pad_cell(cell, *width, alignments[col_idx]));
            output.push_str(" |");
        }
        output.push('\n');

        if row_idx == 0 {
            output.push('|');
            for (col_idx, width) in col_widths.iter().enumerate() {
                output.push_str(&format_separator(*width, alignments[col_idx]));
                output.push('|');
            }
            output.push('\n');
        }
    }

    output.trim_end().to_string()
}

fn closest_table<'a>(node: &NodeRef<'a>) -> Option<NodeRef<'a>> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if dom::node_tag(&parent).as_deref() == Some("table") {
            return Some(parent);
        }
        current = parent.parent();
    }
    None
}

fn cell_text(cell: &NodeRef) -> String {
    let text = cell.text();
    let collapsed = WHITESPACE_RUN.replace_all(text.trim(), " ");
    escape_markdown(&collapsed, false).replace('|', "\\|")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alignment {
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "left" => Self::Left,
            "center" => Self::Center,
            "right" => Self::Right,
            _ => Self::None,
        }
    }
}

fn format_separator(width: usize, align: Alignment) -> String {
    let dashes = width.max(3);
    match align {
        Alignment::Left => format!(" :{} ", "-".repeat(dashes - 1)),
        Alignment::Center => format!(" :{}: ", "-".repeat(dashes.saturating_sub(2))),
        Alignment::Right => format!(" {}: ", "-".repeat(dashes - 1)),
        Alignment::None => format!(" {} ", "-".repeat(dashes)),
    }
}

fn pad_cell(text: &str, width: usize, align: Alignment) -> String {
    let text_len = text.chars().count();
    if text_len >= width {
        return text.to_string();
    }

    let padding = width - text_len;
    match align {
        Alignment::Right => format!("{}{}", " ".repeat(padding), text),
        Alignment::Center => {
            let left = padding / 2;
            let right = padding - left;
            format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
        }
        _ => format!("{}{}", text, " ".repeat(padding)),
    }
}

// === Finishing ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Text,
    FenceOpen,
    FenceClose,
}

/// Tracks whether lines sit inside a fenced code block.
#[derive(Default)]
struct FenceTracker {
    open: Option<usize>,
}

impl FenceTracker {
    fn observe(&mut self, line: &str) -> LineKind {
        let trimmed = line.trim_start();
        let ticks = trimmed.len() - trimmed.trim_start_matches('`').len();
        match self.open {
            // An info string containing a backtick makes the line inline code.
            None if ticks >= MIN_FENCE && !trimmed[ticks..].contains('`') => {
                self.open = Some(ticks);
                LineKind::FenceOpen
            }
            Some(open) if ticks >= open && trimmed.trim_end().len() == ticks => {
                self.open = None;
                LineKind::FenceClose
            }
            _ => LineKind::Text,
        }
    }

    const fn inside(&self) -> bool {
        self.open.is_some()
    }
}

/// Normalize line separators, collapse blank-line runs outside fences, and
/// trim the document.
fn finish(markdown: &str) -> String {
    let normalized = markdown.replace(['\u{2028}', '\u{2029}'], "\n");

    let mut tracker = FenceTracker::default();
    let mut out: Vec<&str> = Vec::new();
    let mut previous_blank = false;
    for line in normalized.lines() {
        let in_code = tracker.inside();
        let kind = tracker.observe(line);
        if in_code && kind == LineKind::Text {
            out.push(line);
            previous_blank = false;
            continue;
        }

        let line = line.trim_end();
        if line.is_empty() {
            if !previous_blank {
                out.push("");
            }
            previous_blank = true;
        } else {
            out.push(line);
            previous_blank = false;
        }
    }

    out.join("\n").trim().to_string()
}
