//! Bot-challenge detection.
//!
//! Heuristic only: the page title and a short prefix of the body text are
//! matched against known interstitial signatures. Both are only consulted
//! for short bodies, since a real conversation easily mentions "verify" or
//! "access denied" somewhere, title included.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::backend::{PageProbe, PageSession};
use crate::error::Result;
use crate::patterns::{CHALLENGE_BODY, CHALLENGE_TITLE, TITLE_BRANDING};

/// Bodies at least this long are never treated as challenges by content.
pub const BODY_GUARD_CHARS: usize = 1500;

/// Whether a probe looks like a bot-challenge interstitial.
///
/// # Example
///
/// ```rust
/// use share_scribe::backend::PageProbe;
/// use share_scribe::challenge::looks_like_challenge;
///
/// let probe = PageProbe::from_text("Just a moment...", "Checking your browser");
/// assert!(looks_like_challenge(&probe));
/// ```
#[must_use]
pub fn looks_like_challenge(probe: &PageProbe) -> bool {
    if probe.body_len >= BODY_GUARD_CHARS {
        return false;
    }
    let title = TITLE_BRANDING.replace_all(probe.title.trim(), "");
    CHALLENGE_TITLE.is_match(&title) || CHALLENGE_BODY.is_match(&probe.body_prefix)
}

/// Outcome of [`ChallengeDetector::wait_until_clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeStatus {
    /// No signature matched.
    Clear,
    /// Still challenged after the whole schedule.
    Blocked,
}

/// Re-probes a page on an increasing wait schedule.
#[derive(Debug, Clone)]
pub struct ChallengeDetector {
    schedule: Vec<Duration>,
}

impl ChallengeDetector {
    #[must_use]
    pub const fn new(schedule: Vec<Duration>) -> Self {
        Self { schedule }
    }

    /// Probe until the page is clear, the schedule is exhausted, or `budget`
    /// runs out. Each wait is clipped to what is left of `budget`.
    ///
    /// A failed probe counts as "still challenged": interstitials often
    /// reload the page mid-evaluation.
    pub async fn wait_until_clear<S: PageSession>(
        &self,
        session: &S,
        budget: Duration,
    ) -> Result<ChallengeStatus> {
        let deadline = Instant::now() + budget;

        if !self.challenged(session).await {
            return Ok(ChallengeStatus::Clear);
        }
        info!(backend = %session.kind(), "bot challenge detected");

        for (attempt, wait) in self.schedule.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep((*wait).min(remaining)).await;
            if !self.challenged(session).await {
                debug!(attempt = attempt + 1, "challenge cleared");
                return Ok(ChallengeStatus::Clear);
            }
        }

        Ok(ChallengeStatus::Blocked)
    }

    async fn challenged<S: PageSession>(&self, session: &S) -> bool {
        match session.probe().await {
            Ok(probe) => looks_like_challenge(&probe),
            Err(e) => {
                debug!(error = %e, "probe failed, assuming challenge is still up");
                true
            }
        }
    }
}

impl Default for ChallengeDetector {
    fn default() -> Self {
        Self::new(crate::options::ScrapeOptions::default().challenge_schedule)
    }
}
