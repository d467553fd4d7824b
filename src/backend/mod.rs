//! Automation backends.
//!
//! A backend hands the orchestrator one [`PageSession`] at a time. Two
//! implementations ship with the crate:
//!
//! - [`chromium`] drives Chrome over the DevTools protocol, either by
//!   launching a scripted instance (headless or headful) or by attaching to
//!   a browser the user started with `--remote-debugging-port`.
//! - [`snapshot`] replays a saved page snapshot, with no browser at all.
//!
//! Traits use native `async fn` with static dispatch. Sessions are never
//! shared: the orchestrator owns each one and passes it to `close` before
//! opening the next.

use std::fmt;
use std::io::IsTerminal;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::options::ScrapeOptions;
use crate::provider::Provider;

#[cfg(feature = "browser")]
pub mod chromium;
pub mod snapshot;
pub mod stealth;

#[cfg(feature = "browser")]
pub use chromium::{ChromiumFactory, ChromiumSession};
pub use snapshot::{StaticFactory, StaticPage};

/// Which automation technique a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// A browser launched under program control.
    Scripted { headless: bool },
    /// A user-launched browser reached through its debug endpoint.
    Attached,
}

impl BackendKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scripted { headless: true } => "scripted-headless",
            Self::Scripted { headless: false } => "scripted-headful",
            Self::Attached => "attached",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cheap view of the loaded page used by the challenge detector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageProbe {
    /// Document title.
    pub title: String,
    /// Length of the body text, in characters.
    pub body_len: usize,
    /// First characters of the body text.
    pub body_prefix: String,
}

/// Characters of body text carried in a [`PageProbe`].
pub const PROBE_PREFIX_CHARS: usize = 2000;

impl PageProbe {
    /// Build a probe from full body text.
    #[must_use]
    pub fn from_text(title: impl Into<String>, body: &str) -> Self {
        Self {
            title: title.into(),
            body_len: body.chars().count(),
            body_prefix: body.chars().take(PROBE_PREFIX_CHARS).collect(),
        }
    }
}

/// One live page owned by the orchestrator.
#[allow(async_fn_in_trait)]
pub trait PageSession {
    fn kind(&self) -> BackendKind;

    /// Load `url`, failing with [`Error::NavigationTimeout`] after `timeout`.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    async fn probe(&self) -> Result<PageProbe>;

    /// Number of elements matching `selector`, including inside open shadow roots.
    async fn count_matches(&self, selector: &str) -> Result<usize>;

    async fn scroll_to_bottom(&self) -> Result<()>;

    /// Serialized document with shadow roots inlined as `<share-shadow-root>`.
    async fn snapshot(&self) -> Result<String>;

    /// Release the page (and the browser, for scripted sessions).
    async fn close(self) -> Result<()>;
}

/// Opens sessions of a given kind.
#[allow(async_fn_in_trait)]
pub trait SessionFactory {
    type Session: PageSession;

    /// Open a fresh session. Launch or attach failures surface as
    /// [`Error::BackendLaunchFailure`].
    async fn open(&self, kind: BackendKind, options: &ScrapeOptions) -> Result<Self::Session>;
}

/// Hands a blocked attached page to a human.
#[allow(async_fn_in_trait)]
pub trait ChallengeSolver {
    /// Whether a human can be asked at all.
    fn is_available(&self) -> bool;

    /// Ask the user to solve the challenge in their browser and wait until
    /// they confirm or `timeout` elapses.
    async fn solve(&self, provider: Provider, url: &str, timeout: Duration) -> Result<()>;
}

/// Prompts on stderr and waits for Enter on stdin.
///
/// The read runs on a blocking thread that outlives a timed-out prompt, so
/// the owning runtime must be shut down with `shutdown_timeout` rather than
/// dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalSolver;

impl ChallengeSolver for TerminalSolver {
    fn is_available(&self) -> bool {
        std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
    }

    async fn solve(&self, provider: Provider, url: &str, timeout: Duration) -> Result<()> {
        info!(%provider, url, "waiting for manual challenge solving");
        eprintln!(
            "\nThe {} page is showing a bot check in your browser.\nSolve it in the browser tab that just opened, then press Enter here.",
            provider.display_name()
        );

        let read = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| ())
        });

        match tokio::time::timeout(timeout, read).await {
            Ok(Ok(result)) => result.map_err(Error::from),
            Ok(Err(join)) => Err(Error::Browser(format!("prompt task failed: {join}"))),
            Err(_) => Err(Error::ChallengeBlocked { provider }),
        }
    }
}

/// Solver used where nobody can answer a prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSolver;

impl ChallengeSolver for NoSolver {
    fn is_available(&self) -> bool {
        false
    }

    async fn solve(&self, provider: Provider, _url: &str, _timeout: Duration) -> Result<()> {
        Err(Error::ChallengeBlocked { provider })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_from_text_counts_chars() {
        let body = "é".repeat(PROBE_PREFIX_CHARS + 10);
        let probe = PageProbe::from_text("t", &body);
        assert_eq!(probe.body_len, PROBE_PREFIX_CHARS + 10);
        assert_eq!(probe.body_prefix.chars().count(), PROBE_PREFIX_CHARS);
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(BackendKind::Scripted { headless: true }.to_string(), "scripted-headless");
        assert_eq!(BackendKind::Attached.name(), "attached");
    }

    #[test]
    fn test_no_solver_is_unavailable() {
        assert!(!NoSolver.is_available());
    }
}
