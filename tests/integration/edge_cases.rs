//! Edge case integration tests
//!
//! Tests for unusual snapshots, boundary conditions, and error handling.

use share_scribe::markdown::count_fences;
use share_scribe::{extract_snapshot, Error, Provider, ScrapeOptions};

fn extract(html: &str, url: &str) -> share_scribe::Result<share_scribe::ShareExport> {
    extract_snapshot(html, url, &ScrapeOptions::default())
}

#[test]
fn test_unknown_host_uses_chatgpt_catalog() {
    let html = r#"<html><body>
        <div data-message-author-role="user"><p>hello</p></div>
        <div data-message-author-role="assistant"><p>hi</p></div>
    </body></html>"#;

    let export = extract(html, "https://mirror.example/share/abc");
    assert_eq!(
        export.map(|e| e.source.provider()).ok(),
        Some(Provider::ChatGpt)
    );
}

#[test]
fn test_empty_snapshot_reports_missing_selectors() {
    let err = extract("<html><body></body></html>", "https://grok.com/share/e").err();
    assert!(matches!(
        err,
        Some(Error::SelectorNotFound {
            provider: Provider::Grok,
            ..
        })
    ));
}

#[test]
fn test_long_page_mentioning_verification_still_extracts() {
    let mut body = String::from("<div data-message-author-role=\"user\"><p>Should I make users verify you are human?</p></div><div data-message-author-role=\"assistant\">");
    while body.len() < 3000 {
        body.push_str("<p>Checking your browser fingerprint is one way to spot unusual traffic.</p>");
    }
    body.push_str("</div>");
    let html = format!("<html><head><title>ChatGPT - Bot checks</title></head><body>{body}</body></html>");

    let export = extract(&html, "https://chatgpt.com/share/v");
    assert_eq!(export.map(|e| e.result.messages().len()).ok(), Some(2));
}

#[test]
fn test_nested_matches_keep_outermost() {
    let html = r#"<html><body>
        <div data-message-author-role="user"><p>outer</p>
            <div data-message-author-role="assistant"><p>inner</p></div>
        </div>
        <div data-message-author-role="assistant"><p>reply</p></div>
    </body></html>"#;

    let export = extract(html, "https://chatgpt.com/share/n");
    let count = export.map(|e| e.result.messages().len()).ok();
    assert_eq!(count, Some(2));
}

#[test]
fn test_code_with_fences_inside_a_conversation() {
    let html = r#"<html><body>
        <div data-message-author-role="user"><p>Show a markdown code fence</p></div>
        <div data-message-author-role="assistant">
            <pre><code class="language-markdown">```js
console.log(1)
```</code></pre>
            <p>Inline: <code>``</code></p>
        </div>
    </body></html>"#;

    let export = extract(html, "https://chatgpt.com/share/f");
    let md = export.map(|e| e.markdown).unwrap_or_default();
    assert!(md.contains("````markdown\n```js\nconsole.log(1)\n```\n````"));
    assert_eq!(count_fences(&md) % 2, 0);
}

#[test]
fn test_image_only_turn_is_kept() {
    let html = r#"<html><body>
        <div data-message-author-role="user"><img src="https://files.example/cat.png" alt="cat"></div>
        <div data-message-author-role="assistant"><p>A cat.</p></div>
    </body></html>"#;

    let export = extract(html, "https://chatgpt.com/share/i");
    let md = export.map(|e| e.markdown).unwrap_or_default();
    assert!(md.contains("![cat](https://files.example/cat.png)"));
}

#[test]
fn test_deeply_nested_turns() {
    let mut html = String::from("<html><body>");
    for i in 0..50 {
        html.push_str(&format!("<div class='level-{i}'>"));
    }
    html.push_str(r#"<div data-message-author-role="user"><p>deep question</p></div>"#);
    html.push_str(r#"<div data-message-author-role="assistant"><p>deep answer</p></div>"#);
    for _ in 0..50 {
        html.push_str("</div>");
    }
    html.push_str("</body></html>");

    let md = extract(&html, "https://chatgpt.com/share/d")
        .map(|e| e.markdown)
        .unwrap_or_default();
    assert!(md.contains("## Assistant\n\ndeep answer\n"));
}
