//! Error types for share-scribe.
//!
//! This module defines the failure taxonomy surfaced by scraping, extraction
//! and rendering. Transient kinds are retried inside the component that
//! raised them; structural kinds are turned into escalation signals by the
//! orchestrator and only reach the caller once the ladder is exhausted.

use crate::provider::Provider;

/// Error type for scraping and extraction operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Navigation did not finish within its share of the timeout budget.
    #[error("navigation to {url} timed out after {timeout_ms} ms")]
    NavigationTimeout {
        /// Target URL.
        url: String,
        /// Stage budget that was exceeded.
        timeout_ms: u64,
    },

    /// Navigation failed for a reason other than a timeout.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// A bot-challenge interstitial never cleared.
    #[error("{provider} share page is blocked by a bot challenge")]
    ChallengeBlocked {
        /// Provider whose page was blocked.
        provider: Provider,
    },

    /// No selector group matched the rendered page.
    #[error("no conversation selector matched the {provider} page (tried {tried} groups)")]
    SelectorNotFound {
        /// Provider whose catalog was exhausted.
        provider: Provider,
        /// Number of selector groups tried.
        tried: usize,
    },

    /// A selector matched but no message survived cleaning.
    #[error("no messages found on the page")]
    NoMessagesFound,

    /// The automation backend could not be started or attached.
    #[error("browser backend failed to start: {0}")]
    BackendLaunchFailure(String),

    /// The next escalation step is not available on this host.
    #[error("escalation not supported: {0}")]
    UnsupportedEscalation(String),

    /// The overall timeout budget ran out.
    #[error("timeout budget exhausted during {stage}")]
    BudgetExhausted {
        /// Stage that was running when the budget ran out.
        stage: String,
    },

    /// A browser command failed after the page was loaded.
    #[error("browser command failed: {0}")]
    Browser(String),

    /// A caller-supplied selector could not be parsed.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// Reading or writing a local file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Actionable hint shown to the user alongside the error.
    #[must_use]
    pub fn hint(&self) -> &'static str {
        match self {
            Self::NavigationTimeout { .. } | Self::BudgetExhausted { .. } => {
                "increase the timeout budget or check the network connection"
            }
            Self::Navigation(_) => "check that the share link is public and spelled correctly",
            Self::ChallengeBlocked { .. } => {
                "this requires manual challenge-solving: start Chrome with --remote-debugging-port=9222 and set SHARE_SCRIBE_DEBUG_ENDPOINT"
            }
            Self::SelectorNotFound { .. } | Self::NoMessagesFound => {
                "the page layout may have changed; try an override selector"
            }
            Self::BackendLaunchFailure(_) => {
                "install Chrome/Chromium or set SHARE_SCRIBE_CHROME to its executable"
            }
            Self::UnsupportedEscalation(_) => {
                "run interactively with a debug endpoint configured to allow attach mode"
            }
            Self::Browser(_) => "retry; the browser connection may have dropped",
            Self::InvalidSelector(_) => "check the override selector syntax",
            Self::Io(_) => "check file permissions and paths",
        }
    }

    /// Whether a component may retry locally before reporting upwards.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NavigationTimeout { .. } | Self::Browser(_))
    }
}

/// Result type alias for scraping operations.
pub type Result<T> = std::result::Result<T, Error>;
