//! # share-scribe
//!
//! Turns public share links of AI chat conversations (ChatGPT, Claude,
//! Gemini, Grok) into clean Markdown and a standalone HTML page.
//!
//! ## Quick Start
//!
//! Offline, from a saved page snapshot:
//!
//! ```rust
//! use share_scribe::{extract_snapshot, Role, ScrapeOptions};
//!
//! let html = r#"<html><head><title>ChatGPT - Sorting</title></head><body>
//!     <div data-message-author-role="user"><p>How do I sort a Vec?</p></div>
//!     <div data-message-author-role="assistant"><p>Call <code>v.sort()</code>.</p></div>
//! </body></html>"#;
//!
//! let export = extract_snapshot(html, "https://chatgpt.com/share/abc", &ScrapeOptions::default())?;
//! assert_eq!(export.title, "Sorting");
//! assert_eq!(export.result.messages()[1].role, Role::Assistant);
//! assert!(export.markdown.contains("Call `v.sort()`."));
//! # Ok::<(), share_scribe::Error>(())
//! ```
//!
//! Live, through a browser (feature `browser`):
//!
//! ```rust,no_run
//! # async fn run() -> share_scribe::Result<()> {
//! let export = share_scribe::scrape("https://claude.ai/share/abc", &share_scribe::ScrapeOptions::from_env()).await?;
//! println!("{}", export.markdown);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! - **Provider resolution**: the share URL picks a provider
//! - **Escalation**: scripted headless, scripted headful, then a
//!   user-operated browser, until a stage yields messages
//! - **Discovery**: per-provider selector groups are tried in order
//! - **Extraction**: roles are inferred, UI chrome removed, code normalized
//! - **Output**: Markdown with collision-free fences, and a script-free
//!   highlighted HTML page

mod error;
mod options;
mod patterns;
mod provider;
mod result;

/// DOM helpers and the shadow-root aware collector.
pub mod dom;

/// Selector groups, discovery and UI-chrome rules.
pub mod selector;

/// Automation backends (Chrome over CDP, snapshot replay).
pub mod backend;

/// Bot-challenge detection.
pub mod challenge;

/// Escalation ladder, budget and orchestrator.
pub mod escalation;

/// Message extraction (role inference, cleaning, titles).
pub mod extractor;

/// HTML to Markdown conversion.
pub mod markdown;

/// Standalone HTML rendering.
pub mod render;

// Public API - re-exports
pub use error::{Error, Result};
pub use escalation::{Scraper, StageTrace};
pub use options::{ScrapeOptions, ENV_CHROME, ENV_DEBUG_ENDPOINT, ENV_TIMEOUT_MS};
pub use provider::{ConversationSource, Provider};
pub use render::{render_document, render_html, DocumentMeta};
pub use result::{ExtractionResult, RenderedDocument, Role, ScrapedMessage, ShareExport};

use chrono::Utc;
use tracing::debug;

use backend::PageProbe;
use selector::SelectorChoice;

/// Scrape a share URL with Chrome, escalating as needed.
///
/// Uses [`backend::ChromiumFactory`] and prompts on the terminal when a
/// challenge needs solving in attach mode.
#[cfg(feature = "browser")]
pub async fn scrape(url: &str, options: &ScrapeOptions) -> Result<ShareExport> {
    Scraper::new(backend::ChromiumFactory, backend::TerminalSolver, options.clone())
        .run(url)
        .await
}

/// Extract a conversation from a saved page snapshot, without a browser.
///
/// `url` selects the provider. The override selector, when set, bypasses
/// discovery exactly as in a live scrape.
pub fn extract_snapshot(html: &str, url: &str, options: &ScrapeOptions) -> Result<ShareExport> {
    let source = ConversationSource::new(url);
    let provider = source.provider();
    let doc = dom::parse(html);

    let choice = match options.override_selector.as_deref() {
        Some(selector) => SelectorChoice::from_override(selector)?,
        None => match selector::discover_in_document(&doc, provider) {
            Ok(choice) => choice,
            Err(e) => {
                let title = doc.select("title").text();
                let body = doc.select("body").text();
                let probe = PageProbe::from_text(title.trim(), body.trim());
                if challenge::looks_like_challenge(&probe) {
                    return Err(Error::ChallengeBlocked { provider });
                }
                return Err(e);
            }
        },
    };
    debug!(%provider, group = choice.group, "extracting snapshot");

    let result = extractor::extract(
        &doc,
        provider,
        &choice.selector,
        options.title_override.as_deref(),
        Utc::now(),
    )?;
    Ok(ShareExport::new(source, result, Vec::new()))
}
