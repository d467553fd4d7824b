//! Offline backend replaying saved page snapshots.
//!
//! [`StaticFactory`] serves one snapshot (or a scripted failure) per
//! [`BackendKind`] and keeps counters of the sessions it handed out, so the
//! escalation ladder can be exercised and inspected without a browser.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{BackendKind, PageProbe, PageSession, SessionFactory};
use crate::dom;
use crate::error::{Error, Result};
use crate::options::ScrapeOptions;

/// What a session of one backend kind does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replay {
    /// Navigation succeeds and the page shows this HTML.
    Page(String),
    /// Navigation fails with this message.
    NavigationError(String),
    /// Navigation hangs until its timeout.
    NavigationTimeout,
    /// The backend cannot be opened.
    LaunchFailure(String),
}

#[derive(Debug, Default)]
struct Counters {
    live: AtomicUsize,
    max_live: AtomicUsize,
    opened: Mutex<Vec<BackendKind>>,
}

/// Serves [`StaticPage`]s.
#[derive(Debug, Clone)]
pub struct StaticFactory {
    default: Replay,
    per_kind: HashMap<BackendKind, Replay>,
    counters: Arc<Counters>,
}

impl StaticFactory {
    /// Every backend kind shows `html`.
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self::with_default(Replay::Page(html.into()))
    }

    #[must_use]
    pub fn with_default(default: Replay) -> Self {
        Self {
            default,
            per_kind: HashMap::new(),
            counters: Arc::default(),
        }
    }

    /// Override the behavior of one backend kind.
    #[must_use]
    pub fn with(mut self, kind: BackendKind, replay: Replay) -> Self {
        self.per_kind.insert(kind, replay);
        self
    }

    /// Backend kinds opened so far, in order.
    #[must_use]
    pub fn opened(&self) -> Vec<BackendKind> {
        self.counters
            .opened
            .lock()
            .map(|kinds| kinds.clone())
            .unwrap_or_default()
    }

    /// Sessions opened and not yet closed.
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live sessions.
    #[must_use]
    pub fn max_live_sessions(&self) -> usize {
        self.counters.max_live.load(Ordering::SeqCst)
    }
}

impl SessionFactory for StaticFactory {
    type Session = StaticPage;

    async fn open(&self, kind: BackendKind, _options: &ScrapeOptions) -> Result<StaticPage> {
        if let Ok(mut opened) = self.counters.opened.lock() {
            opened.push(kind);
        }
        let replay = self.per_kind.get(&kind).unwrap_or(&self.default).clone();
        if let Replay::LaunchFailure(message) = replay {
            return Err(Error::BackendLaunchFailure(message));
        }

        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(StaticPage {
            kind,
            replay,
            counters: Some(Arc::clone(&self.counters)),
        })
    }
}

/// A page backed by a snapshot string.
#[derive(Debug)]
pub struct StaticPage {
    kind: BackendKind,
    replay: Replay,
    counters: Option<Arc<Counters>>,
}

impl StaticPage {
    /// A standalone page showing `html`.
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            kind: BackendKind::Scripted { headless: true },
            replay: Replay::Page(html.into()),
            counters: None,
        }
    }

    fn html(&self) -> &str {
        match &self.replay {
            Replay::Page(html) => html,
            _ => "",
        }
    }
}

impl PageSession for StaticPage {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        match &self.replay {
            Replay::Page(_) | Replay::LaunchFailure(_) => Ok(()),
            Replay::NavigationError(message) => Err(Error::Navigation(message.clone())),
            Replay::NavigationTimeout => {
                tokio::time::sleep(timeout).await;
                Err(Error::NavigationTimeout {
                    url: url.to_string(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }

    async fn probe(&self) -> Result<PageProbe> {
        let doc = dom::parse(self.html());
        let title = doc.select("title").text().trim().to_string();
        let body = doc.select("body").text();
        Ok(PageProbe::from_text(title, body.trim()))
    }

    async fn count_matches(&self, selector: &str) -> Result<usize> {
        Ok(dom::count_matches(&dom::parse(self.html()), selector))
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        Ok(())
    }

    async fn snapshot(&self) -> Result<String> {
        Ok(self.html().to_string())
    }

    async fn close(self) -> Result<()> {
        if let Some(counters) = &self.counters {
            counters.live.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
