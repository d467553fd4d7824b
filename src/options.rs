//! Configuration options for scraping a share page.
//!
//! The `ScrapeOptions` struct is threaded through the orchestrator as a plain
//! value. There is no process-wide configuration state.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming a Chrome DevTools endpoint for attach mode.
pub const ENV_DEBUG_ENDPOINT: &str = "SHARE_SCRIBE_DEBUG_ENDPOINT";

/// Environment variable naming the Chrome/Chromium executable.
pub const ENV_CHROME: &str = "SHARE_SCRIBE_CHROME";

/// Environment variable overriding the overall timeout, in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "SHARE_SCRIBE_TIMEOUT_MS";

/// Configuration options for a scrape.
///
/// All fields are public for easy configuration. Use `Default::default()`
/// for standard settings.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use share_scribe::ScrapeOptions;
///
/// let options = ScrapeOptions {
///     timeout: Duration::from_secs(45),
///     override_selector: Some("article".to_string()),
///     ..ScrapeOptions::default()
/// };
/// assert!(options.auto_scroll);
/// ```
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct ScrapeOptions {
    /// Overall timeout budget shared by every escalation stage.
    ///
    /// Default: `90s`
    pub timeout: Duration,

    /// CSS selector used as-is instead of running selector discovery.
    ///
    /// Default: `None`
    pub override_selector: Option<String>,

    /// Title used instead of the page title.
    ///
    /// Default: `None`
    pub title_override: Option<String>,

    /// Skip the headless stage and start with a visible browser window.
    ///
    /// Default: `false`
    pub start_headful: bool,

    /// Go straight to attach mode.
    ///
    /// Default: `false`
    pub force_attach: bool,

    /// Allow the ladder to escalate into attach mode at all.
    ///
    /// Default: `true`
    pub allow_attach: bool,

    /// DevTools endpoint of a user-launched browser, e.g.
    /// `http://127.0.0.1:9222`. Attach mode is unavailable without it.
    ///
    /// Default: `None`
    pub debug_endpoint: Option<String>,

    /// Browser executable for scripted stages. Auto-detected when `None`.
    ///
    /// Default: `None`
    pub chrome_executable: Option<PathBuf>,

    /// Profile directory for scripted stages. A throwaway profile is used
    /// when `None`.
    ///
    /// Default: `None`
    pub user_data_dir: Option<PathBuf>,

    /// Scroll to the bottom before taking the snapshot so lazily rendered
    /// turns are attached to the DOM.
    ///
    /// Default: `true`
    pub auto_scroll: bool,

    /// Extra navigation attempts after a navigation timeout.
    ///
    /// Default: `1`
    pub navigation_retries: usize,

    /// Waits between challenge re-checks. The number of entries bounds the
    /// number of re-checks.
    ///
    /// Default: `[1s, 2s, 4s, 8s]`
    pub challenge_schedule: Vec<Duration>,

    /// Interval between selector polls during discovery.
    ///
    /// Default: `250ms`
    pub poll_interval: Duration,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(90),
            override_selector: None,
            title_override: None,
            start_headful: false,
            force_attach: false,
            allow_attach: true,
            debug_endpoint: None,
            chrome_executable: None,
            user_data_dir: None,
            auto_scroll: true,
            navigation_retries: 1,
            challenge_schedule: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ],
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl ScrapeOptions {
    /// Defaults overlaid with `SHARE_SCRIBE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Overlay values looked up through `lookup`. Unparsable values are ignored.
    #[must_use]
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(endpoint) = lookup(ENV_DEBUG_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            self.debug_endpoint = Some(endpoint.trim().to_string());
        }
        if let Some(chrome) = lookup(ENV_CHROME).filter(|v| !v.trim().is_empty()) {
            self.chrome_executable = Some(PathBuf::from(chrome.trim()));
        }
        if let Some(ms) = lookup(ENV_TIMEOUT_MS).and_then(|v| v.trim().parse::<u64>().ok()) {
            self.timeout = Duration::from_millis(ms);
        }
        self
    }
}
