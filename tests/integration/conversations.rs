//! End-to-end tests over realistic share-page snapshots.

#![allow(clippy::expect_used)] // expect() is appropriate in tests for clear panic messages

use share_scribe::markdown::count_fences;
use share_scribe::{extract_snapshot, render_document, Role, ScrapeOptions, ShareExport};

/// Test fixture path helper
fn fixture_path(name: &str) -> String {
    format!(
        "{}/tests/integration/fixtures/{}",
        env!("CARGO_MANIFEST_DIR"),
        name
    )
}

fn export_fixture(name: &str, url: &str) -> ShareExport {
    let html = std::fs::read_to_string(fixture_path(name)).expect("Failed to read fixture");
    match extract_snapshot(&html, url, &ScrapeOptions::default()) {
        Ok(export) => export,
        Err(err) => panic!("Extraction of {name} failed: {err:?}"),
    }
}

#[test]
fn test_chatgpt_share_to_markdown() {
    let export = export_fixture("chatgpt_share.html", "https://chatgpt.com/share/6700-abcd");
    let md = &export.markdown;

    assert_eq!(export.title, "Reading a file line by line");
    let roles: Vec<Role> = export.result.messages().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );

    assert!(md.starts_with("# Reading a file line by line\n\n- Source: <https://chatgpt.com/share/6700-abcd>\n"));
    assert!(md.contains("## User\n\nHow do I read a file line by line in Rust?\n"));
    assert!(md.contains("Wrap the file in a `BufReader` and call **lines()**:"));
    assert!(md.contains("```rust\nuse std::fs::File;\n"));
    assert!(md.contains("fn main() -> std::io::Result<()> {"));
    assert!(md.contains("- Each line has its trailing newline removed."));
    assert!(md.contains("| Method"));
    assert!(md.contains("iterate with `.rev()`."));
    assert!(md.ends_with('\n'));

    // UI chrome and provider attributes never leak.
    for noise in ["Copy code", "Good response", "data-start", "You said", "Report content"] {
        assert!(!md.contains(noise), "{noise} leaked into markdown");
    }
    assert_eq!(count_fences(md) % 2, 0);
}

#[test]
fn test_claude_share_to_markdown() {
    let export = export_fixture("claude_share.html", "https://claude.ai/share/1b2c");
    let md = &export.markdown;

    assert_eq!(export.title, "Lifetimes in structs");
    assert_eq!(export.result.messages().len(), 2);
    assert!(md.contains("## User\n\nWhy does my struct need a lifetime?\n\n## Assistant\n\n"));
    assert!(md.contains("Because it *borrows* data it does not own."));
    assert!(md.contains("> References must never outlive their referent."));
    assert!(md.contains("3. Name the lifetime.\n4. Tie the field to it."));
    assert!(!md.contains("Retry"));
}

#[test]
fn test_share_to_html_page() {
    let export = export_fixture("chatgpt_share.html", "https://chatgpt.com/share/6700-abcd");
    let rendered = render_document(&export.result, export.source.url());
    let html = rendered.html.to_ascii_lowercase();

    assert_eq!(rendered.markdown, export.markdown);
    assert!(html.starts_with("<!doctype html>"));
    assert!(html.contains("<title>reading a file line by line</title>"));
    assert!(html.contains(">rust</figcaption>"));
    assert!(html.contains("<table>"));
    assert!(html.contains(r#"href="https://chatgpt.com/share/6700-abcd""#));
    assert!(!html.contains("<script"));
}

#[test]
fn test_same_snapshot_same_output() {
    let first = export_fixture("claude_share.html", "https://claude.ai/share/1b2c");
    let second = export_fixture("claude_share.html", "https://claude.ai/share/1b2c");

    assert_eq!(first.result.messages(), second.result.messages());
    assert_eq!(
        render_document(&first.result, first.source.url()),
        render_document(&first.result, first.source.url())
    );
}
