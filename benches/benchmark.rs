//! Performance benchmarks for share-scribe.
//!
//! Run with: `cargo bench`
//!
//! Benchmarks include:
//! - Snapshot extraction of synthetic conversations of growing length
//! - HTML to Markdown conversion of a code-heavy message
//! - Standalone HTML rendering with syntax highlighting

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use share_scribe::markdown::html_to_markdown;
use share_scribe::{extract_snapshot, render_html, DocumentMeta, ScrapeOptions};

const URL: &str = "https://chatgpt.com/share/bench";

const MESSAGE_HTML: &str = r#"
<p>Here is a <strong>minimal</strong> example with <code>tokio</code>:</p>
<pre><div><div class="flex">rust<button>Copy code</button></div><div><code class="hljs language-rust">#[tokio::main]
async fn main() {
    let body = reqwest::get("https://example.com").await?.text().await?;
    println!("{body}");
}</code></div></div></pre>
<ul><li>First point</li><li>Second point with <a href="https://docs.rs">docs</a></li></ul>
<table><tr><th>Crate</th><th>Use</th></tr><tr><td>tokio</td><td>runtime</td></tr></table>
"#;

fn conversation(turns: usize) -> String {
    let mut html = String::from("<html><head><title>ChatGPT - Bench</title></head><body><main>");
    for i in 0..turns {
        html.push_str(&format!(
            r#"<div data-message-author-role="user"><p>Question {i}: how do I fetch a page?</p></div>
               <div data-message-author-role="assistant">{MESSAGE_HTML}</div>"#
        ));
    }
    html.push_str("</main></body></html>");
    html
}

fn bench_extract_snapshot(c: &mut Criterion) {
    let options = ScrapeOptions::default();
    let mut group = c.benchmark_group("extract_snapshot");

    for turns in [2, 20, 100] {
        let html = conversation(turns);
        group.throughput(Throughput::Bytes(html.len() as u64));
        group.bench_with_input(BenchmarkId::new("turns", turns), &html, |b, html| {
            b.iter(|| extract_snapshot(black_box(html), URL, &options));
        });
    }

    group.finish();
}

fn bench_html_to_markdown(c: &mut Criterion) {
    c.bench_function("html_to_markdown", |b| {
        b.iter(|| html_to_markdown(black_box(MESSAGE_HTML)));
    });
}

fn bench_render_html(c: &mut Criterion) {
    let markdown = extract_snapshot(&conversation(10), URL, &ScrapeOptions::default())
        .map(|export| export.markdown)
        .unwrap_or_default();
    let meta = DocumentMeta::new("Bench").with_source(URL);

    c.bench_function("render_html", |b| {
        b.iter(|| render_html(black_box(&markdown), &meta));
    });
}

criterion_group!(
    benches,
    bench_extract_snapshot,
    bench_html_to_markdown,
    bench_render_html
);
criterion_main!(benches);
