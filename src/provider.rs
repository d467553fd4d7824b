//! Provider resolution.
//!
//! Classifies a share URL into one of the supported chat providers. The
//! resolver never fails: unknown or unparsable URLs default to ChatGPT.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Supported AI chat providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// chatgpt.com / chat.openai.com
    #[serde(rename = "chatgpt")]
    ChatGpt,
    /// gemini.google.com
    Gemini,
    /// grok.com
    Grok,
    /// claude.ai
    Claude,
}

/// Ordered host table. First match wins.
const HOST_TABLE: &[(Provider, &[&str])] = &[
    (Provider::ChatGpt, &["chatgpt.com", "chat.openai.com"]),
    (Provider::Gemini, &["gemini.google.com", "bard.google.com", "g.co"]),
    (Provider::Grok, &["grok.com", "grok.x.ai"]),
    (Provider::Claude, &["claude.ai"]),
];

impl Provider {
    /// All providers, in resolution order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::ChatGpt, Self::Gemini, Self::Grok, Self::Claude]
    }

    /// Resolve the provider for a share URL.
    ///
    /// # Example
    ///
    /// ```rust
    /// use share_scribe::Provider;
    ///
    /// assert_eq!(Provider::resolve("https://claude.ai/share/abc"), Provider::Claude);
    /// assert_eq!(Provider::resolve("not a url"), Provider::ChatGpt);
    /// ```
    #[must_use]
    pub fn resolve(url: &str) -> Self {
        let host = Url::parse(url.trim())
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase));

        let Some(host) = host else {
            debug!(url, "unparsable share url, defaulting to chatgpt");
            return Self::ChatGpt;
        };

        for (provider, patterns) in HOST_TABLE {
            if patterns.iter().any(|p| host_matches(&host, p)) {
                return *provider;
            }
        }

        debug!(%host, "unknown share host, defaulting to chatgpt");
        Self::ChatGpt
    }

    /// Lowercase identifier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ChatGpt => "chatgpt",
            Self::Gemini => "gemini",
            Self::Grok => "grok",
            Self::Claude => "claude",
        }
    }

    /// Product name as it appears in page chrome ("ChatGPT said:").
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::ChatGpt => "ChatGPT",
            Self::Gemini => "Gemini",
            Self::Grok => "Grok",
            Self::Claude => "Claude",
        }
    }

    /// Whether share pages sit behind bot-challenge interstitials.
    ///
    /// Selector discovery failing on a defended provider is treated as a
    /// hidden block and escalates the backend.
    #[must_use]
    pub const fn is_defended(self) -> bool {
        matches!(self, Self::ChatGpt | Self::Claude | Self::Grok)
    }
}

fn host_matches(host: &str, pattern: &str) -> bool {
    host == pattern
        || host
            .strip_suffix(pattern)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chatgpt" | "openai" => Ok(Self::ChatGpt),
            "gemini" | "bard" => Ok(Self::Gemini),
            "grok" => Ok(Self::Grok),
            "claude" => Ok(Self::Claude),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// A share URL together with its resolved provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSource {
    url: String,
    provider: Provider,
}

impl ConversationSource {
    /// Resolve the provider for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let provider = Provider::resolve(&url);
        Self { url, provider }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub const fn provider(&self) -> Provider {
        self.provider
    }
}
