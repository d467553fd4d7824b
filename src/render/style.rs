//! Inline stylesheet of rendered documents.

use std::sync::LazyLock;

use super::highlight::HIGHLIGHT_CSS;

const BASE_CSS: &str = r"
:root {
  --fg: #1f2328;
  --muted: #59636e;
  --bg: #ffffff;
  --panel: #f6f8fa;
  --border: #d1d9e0;
  --link: #0969da;
}
@media (prefers-color-scheme: dark) {
  :root {
    --fg: #e6edf3;
    --muted: #9198a1;
    --bg: #0d1117;
    --panel: #161b22;
    --border: #3d444d;
    --link: #4493f8;
  }
}
* { box-sizing: border-box; }
body {
  margin: 0;
  color: var(--fg);
  background: var(--bg);
  font: 16px/1.6 -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
}
main.document { max-width: 860px; margin: 0 auto; padding: 2rem 1.25rem 4rem; }
a { color: var(--link); }
header.meta { color: var(--muted); font-size: 0.9rem; border-bottom: 1px solid var(--border); margin-bottom: 1.5rem; }
header.meta p { margin: 0.25rem 0; overflow-wrap: anywhere; }
nav.toc { background: var(--panel); border: 1px solid var(--border); border-radius: 6px; padding: 0.75rem 1rem; margin-bottom: 2rem; }
nav.toc .toc-title { font-weight: 600; margin: 0 0 0.5rem; }
nav.toc ul { list-style: none; margin: 0; padding: 0; }
nav.toc .toc-h3 { padding-left: 1rem; }
nav.toc .toc-h4 { padding-left: 2rem; }
h1, h2, h3, h4 { line-height: 1.25; margin: 1.75rem 0 0.75rem; }
h2 { border-bottom: 1px solid var(--border); padding-bottom: 0.3rem; }
blockquote { margin: 0; padding: 0 1rem; color: var(--muted); border-left: 4px solid var(--border); }
table { border-collapse: collapse; display: block; overflow-x: auto; }
th, td { border: 1px solid var(--border); padding: 0.35rem 0.75rem; }
th { background: var(--panel); }
img { max-width: 100%; }
code { font-family: ui-monospace, SFMono-Regular, Menlo, Consolas, monospace; font-size: 0.9em; }
:not(pre) > code { background: var(--panel); padding: 0.1em 0.35em; border-radius: 4px; }
figure.code-block { margin: 1rem 0; border: 1px solid var(--border); border-radius: 6px; overflow: hidden; }
figure.code-block figcaption { font-size: 0.75rem; color: var(--muted); background: var(--panel); padding: 0.25rem 0.75rem; border-bottom: 1px solid var(--border); }
figure.code-block pre { margin: 0; padding: 0.75rem; overflow-x: auto; }
@media print {
  body { background: #ffffff; color: #000000; }
  nav.toc { display: none; }
  a { color: inherit; }
  figure.code-block, pre { break-inside: avoid; }
  figure.code-block pre { white-space: pre-wrap; overflow-wrap: anywhere; }
}
";

/// Complete stylesheet: layout, light and dark palettes, print rules and
/// highlighting classes.
pub static STYLESHEET: LazyLock<String> =
    LazyLock::new(|| format!("{}\n{}", BASE_CSS.trim(), HIGHLIGHT_CSS.as_str()));
