//! Escalation orchestrator.
//!
//! Runs the scrape ladder: scripted headless, scripted headful, then a
//! user-operated browser reached through its debug endpoint. Each rung opens
//! exactly one session, drives it to an [`ExtractionResult`] or a typed
//! error, and closes it before [`transition`] picks the next rung.
//!
//! # Module Structure
//!
//! - `state`: states, signals and the pure transition function
//! - `budget`: the overall timeout budget and its per-stage shares

pub mod budget;
pub mod state;

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{BackendKind, ChallengeSolver, PageSession, SessionFactory};
use crate::challenge::{ChallengeDetector, ChallengeStatus};
use crate::dom;
use crate::error::{Error, Result};
use crate::extractor;
use crate::options::ScrapeOptions;
use crate::provider::{ConversationSource, Provider};
use crate::result::{ExtractionResult, ShareExport};
use crate::selector::{self, discover, SelectorChoice};

pub use budget::{Budget, StageBudget};
pub use state::{transition, FailureKind, Policy, Signal, State};

/// First navigation retry waits this long; later retries double it.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Upper bound for one navigation retry wait.
const RETRY_MAX_DELAY: Duration = Duration::from_secs(4);

/// Record of one escalation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTrace {
    pub stage: State,
    pub backend: BackendKind,
    /// Wall time spent in the stage.
    pub elapsed_ms: u64,
    /// What the stage reported to the state machine.
    pub signal: Signal,
    /// Error message for failed stages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Drives the escalation ladder over a [`SessionFactory`].
///
/// # Example
///
/// ```rust
/// use share_scribe::backend::{NoSolver, StaticFactory};
/// use share_scribe::escalation::Scraper;
/// use share_scribe::ScrapeOptions;
///
/// let page = r#"<html><head><title>Rust questions</title></head><body>
///     <div data-message-author-role="user"><p>Hi</p></div>
///     <div data-message-author-role="assistant"><p>Hello!</p></div>
/// </body></html>"#;
///
/// let scraper = Scraper::new(StaticFactory::new(page), NoSolver, ScrapeOptions::default());
/// let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build()?;
/// let export = runtime.block_on(scraper.run("https://chatgpt.com/share/abc"))?;
///
/// assert_eq!(export.title, "Rust questions");
/// assert!(export.markdown.contains("## Assistant\n\nHello!"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Scraper<F, C> {
    factory: F,
    solver: C,
    options: ScrapeOptions,
    detector: ChallengeDetector,
}

impl<F: SessionFactory, C: ChallengeSolver> Scraper<F, C> {
    #[must_use]
    pub fn new(factory: F, solver: C, options: ScrapeOptions) -> Self {
        let detector = ChallengeDetector::new(options.challenge_schedule.clone());
        Self {
            factory,
            solver,
            options,
            detector,
        }
    }

    #[must_use]
    pub const fn factory(&self) -> &F {
        &self.factory
    }

    #[must_use]
    pub const fn options(&self) -> &ScrapeOptions {
        &self.options
    }

    /// Transition policy for `provider` under the current options.
    #[must_use]
    pub fn policy(&self, provider: Provider) -> Policy {
        Policy {
            defended: provider.is_defended(),
            start_headful: self.options.start_headful,
            force_attach: self.options.force_attach,
            attach_available: self.attach_unavailable_reason().is_none(),
        }
    }

    fn attach_unavailable_reason(&self) -> Option<&'static str> {
        if !self.options.allow_attach {
            Some("attach mode is disabled")
        } else if self.options.debug_endpoint.is_none() {
            Some("no debug endpoint is configured")
        } else if !self.solver.is_available() {
            Some("no interactive terminal for manual challenge solving")
        } else {
            None
        }
    }

    /// Scrape one share URL.
    ///
    /// # Errors
    ///
    /// Returns the error of the last stage once the ladder is exhausted,
    /// [`Error::UnsupportedEscalation`] when the next rung cannot run here,
    /// and [`Error::InvalidSelector`] for an unparsable override selector.
    pub async fn run(&self, url: &str) -> Result<ShareExport> {
        let source = ConversationSource::new(url);
        let provider = source.provider();
        let choice = self
            .options
            .override_selector
            .as_deref()
            .map(SelectorChoice::from_override)
            .transpose()?;
        let policy = self.policy(provider);
        let budget = Budget::new(self.options.timeout);

        let mut trace = Vec::new();
        let mut last_error = None;
        let mut extracted = None;
        let mut state = transition(State::Idle, Signal::Start, &policy);
        info!(%provider, url, stage = state.name(), "starting scrape");

        while let Some(kind) = state.backend() {
            let stage_started = budget.elapsed();
            let outcome = match budget.stage(state) {
                Ok(stage_budget) => {
                    self.run_stage(kind, &source, choice.as_ref(), &stage_budget)
                        .await
                }
                Err(e) => Err(e),
            };

            let signal = match &outcome {
                Ok(_) => Signal::Extracted,
                Err(e) => Signal::from_error(e),
            };
            let elapsed = budget.elapsed().saturating_sub(stage_started);
            trace.push(StageTrace {
                stage: state,
                backend: kind,
                elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                signal,
                error: outcome.as_ref().err().map(ToString::to_string),
            });

            let next = transition(state, signal, &policy);
            match outcome {
                Ok(result) => extracted = Some(result),
                Err(e) => {
                    info!(stage = state.name(), ?signal, error = %e, next = next.name(), "stage failed");
                    last_error = Some(e);
                }
            }
            state = next;
        }

        match (state, extracted) {
            (State::Success, Some(result)) => {
                info!(%provider, messages = result.messages().len(), "scrape succeeded");
                Ok(ShareExport::new(source, result, trace))
            }
            (State::Failure(kind), _) => Err(self.failure_error(kind, provider, last_error)),
            _ => Err(last_error.unwrap_or_else(|| {
                Error::Browser(format!("escalation stopped in state {}", state.name()))
            })),
        }
    }

    fn failure_error(&self, kind: FailureKind, provider: Provider, last: Option<Error>) -> Error {
        match kind {
            FailureKind::UnsupportedEscalation => {
                let reason = self
                    .attach_unavailable_reason()
                    .unwrap_or("attach mode is unavailable");
                match last {
                    Some(e) => Error::UnsupportedEscalation(format!("{reason}; last stage failed: {e}")),
                    None => Error::UnsupportedEscalation(reason.to_string()),
                }
            }
            FailureKind::SelectorNotFound => match last {
                Some(e @ Error::SelectorNotFound { .. }) => e,
                _ => Error::SelectorNotFound {
                    provider,
                    tried: selector::catalog(provider).len(),
                },
            },
            FailureKind::Exhausted | FailureKind::Fatal => {
                last.unwrap_or(Error::ChallengeBlocked { provider })
            }
        }
    }

    /// Open a session, drive it, and close it on every path.
    async fn run_stage(
        &self,
        kind: BackendKind,
        source: &ConversationSource,
        choice: Option<&SelectorChoice>,
        budget: &StageBudget,
    ) -> Result<ExtractionResult> {
        info!(backend = %kind, budget_ms = budget.total().as_millis(), "opening session");
        let session = self.factory.open(kind, &self.options).await?;

        let outcome = self.drive(&session, source, choice, budget).await;

        if let Err(e) = session.close().await {
            warn!(backend = %kind, error = %e, "failed to close session");
        }
        outcome
    }

    async fn drive<S: PageSession>(
        &self,
        session: &S,
        source: &ConversationSource,
        choice: Option<&SelectorChoice>,
        budget: &StageBudget,
    ) -> Result<ExtractionResult> {
        let provider = source.provider();
        let url = source.url();

        self.navigate(session, url, budget).await?;
        self.clear_challenge(session, provider, url, budget).await?;

        if self.options.auto_scroll {
            if let Err(e) = session.scroll_to_bottom().await {
                warn!(error = %e, "scrolling failed, continuing with what is loaded");
            }
        }

        let choice = match choice {
            Some(choice) => {
                debug!(selector = %choice.selector, "using override selector");
                choice.clone()
            }
            None => {
                budget.ensure_left("discovery")?;
                discover(session, provider, budget.discovery(), self.options.poll_interval).await?
            }
        };

        let html = session.snapshot().await?;
        let doc = dom::parse(&html);
        extractor::extract(
            &doc,
            provider,
            &choice.selector,
            self.options.title_override.as_deref(),
            Utc::now(),
        )
    }

    /// Navigate, retrying transient failures with a doubling delay.
    async fn navigate<S: PageSession>(&self, session: &S, url: &str, budget: &StageBudget) -> Result<()> {
        let mut attempt = 0;
        loop {
            budget.ensure_left("navigation")?;
            match session.navigate(url, budget.navigation()).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < self.options.navigation_retries => {
                    attempt += 1;
                    let delay = retry_delay(attempt).min(budget.remaining());
                    warn!(
                        url,
                        attempt,
                        max_retries = self.options.navigation_retries,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "retrying navigation"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Wait out a challenge; attached sessions may hand it to the solver.
    async fn clear_challenge<S: PageSession>(
        &self,
        session: &S,
        provider: Provider,
        url: &str,
        budget: &StageBudget,
    ) -> Result<()> {
        if self.detector.wait_until_clear(session, budget.remaining()).await? == ChallengeStatus::Clear {
            return Ok(());
        }
        if session.kind() != BackendKind::Attached || !self.solver.is_available() {
            return Err(Error::ChallengeBlocked { provider });
        }

        self.solver.solve(provider, url, budget.remaining()).await?;
        match self.detector.wait_until_clear(session, budget.remaining()).await? {
            ChallengeStatus::Clear => Ok(()),
            ChallengeStatus::Blocked => Err(Error::ChallengeBlocked { provider }),
        }
    }
}

fn retry_delay(attempt: usize) -> Duration {
    let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
    RETRY_BASE_DELAY.saturating_mul(1 << shift).min(RETRY_MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::snapshot::Replay;
    use crate::backend::{NoSolver, StaticFactory};

    const CHALLENGE: &str = "<html><head><title>Just a moment...</title></head><body>Checking your browser</body></html>";
    const CONVERSATION: &str = r#"<html><head><title>Claude</title></head><body>
        <div data-testid="user-message"><p>Why is the sky blue?</p></div>
        <div class="font-claude-message"><p>Rayleigh scattering.</p></div>
    </body></html>"#;
    const CLAUDE_URL: &str = "https://claude.ai/share/abc";

    struct ReadySolver;

    impl ChallengeSolver for ReadySolver {
        fn is_available(&self) -> bool {
            true
        }

        async fn solve(&self, _provider: Provider, _url: &str, _timeout: Duration) -> Result<()> {
            Ok(())
        }
    }

    fn attach_options() -> ScrapeOptions {
        ScrapeOptions {
            debug_endpoint: Some("http://127.0.0.1:9222".to_string()),
            ..ScrapeOptions::default()
        }
    }

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        assert_eq!(retry_delay(1), Duration::from_millis(500));
        assert_eq!(retry_delay(2), Duration::from_secs(1));
        assert_eq!(retry_delay(10), RETRY_MAX_DELAY);
    }

    #[test]
    fn test_policy_requires_endpoint_and_solver() {
        let scraper = Scraper::new(StaticFactory::new(""), ReadySolver, attach_options());
        assert!(scraper.policy(Provider::Claude).attach_available);

        let scraper = Scraper::new(StaticFactory::new(""), NoSolver, attach_options());
        assert!(!scraper.policy(Provider::Claude).attach_available);

        let scraper = Scraper::new(StaticFactory::new(""), ReadySolver, ScrapeOptions::default());
        assert!(!scraper.policy(Provider::Claude).attach_available);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_stage_success() {
        let scraper = Scraper::new(StaticFactory::new(CONVERSATION), NoSolver, ScrapeOptions::default());
        let export = scraper.run(CLAUDE_URL).await;

        let export = export.ok();
        assert_eq!(export.as_ref().map(|e| e.trace.len()), Some(1));
        assert_eq!(
            export.as_ref().map(|e| e.title.as_str()),
            Some("Why is the sky blue?")
        );
        assert_eq!(scraper.factory().live_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalates_to_attached_after_challenges() {
        let factory = StaticFactory::new(CHALLENGE)
            .with(BackendKind::Attached, Replay::Page(CONVERSATION.to_string()));
        let scraper = Scraper::new(factory, ReadySolver, attach_options());

        let export = scraper.run(CLAUDE_URL).await;
        assert!(export.is_ok());
        assert_eq!(
            scraper.factory().opened(),
            vec![
                BackendKind::Scripted { headless: true },
                BackendKind::Scripted { headless: false },
                BackendKind::Attached,
            ]
        );
        assert_eq!(scraper.factory().max_live_sessions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_escalation_names_last_error() {
        let scraper = Scraper::new(StaticFactory::new(CHALLENGE), NoSolver, ScrapeOptions::default());
        let err = scraper.run(CLAUDE_URL).await.err();
        let message = err.as_ref().map(ToString::to_string).unwrap_or_default();

        assert!(matches!(err, Some(Error::UnsupportedEscalation(_))));
        assert!(message.contains("no debug endpoint"));
        assert!(message.contains("bot challenge"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_failure_is_fatal() {
        let factory = StaticFactory::with_default(Replay::LaunchFailure("no chrome".into()));
        let scraper = Scraper::new(factory, NoSolver, ScrapeOptions::default());
        let err = scraper.run(CLAUDE_URL).await.err();

        assert!(matches!(err, Some(Error::BackendLaunchFailure(_))));
        assert_eq!(scraper.factory().opened().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_timeout_is_retried_then_escalated() {
        let factory = StaticFactory::new(CONVERSATION).with(
            BackendKind::Scripted { headless: true },
            Replay::NavigationTimeout,
        );
        let scraper = Scraper::new(factory, NoSolver, ScrapeOptions::default());
        let export = scraper.run(CLAUDE_URL).await.ok();

        let signals: Vec<Signal> = export
            .map(|e| e.trace.iter().map(|t| t.signal).collect())
            .unwrap_or_default();
        assert_eq!(signals, vec![Signal::BlockingNavigation, Signal::Extracted]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_override_fails_before_any_session() {
        let options = ScrapeOptions {
            override_selector: Some("div[[".to_string()),
            ..ScrapeOptions::default()
        };
        let scraper = Scraper::new(StaticFactory::new(CONVERSATION), NoSolver, options);

        assert!(matches!(
            scraper.run(CLAUDE_URL).await,
            Err(Error::InvalidSelector(_))
        ));
        assert!(scraper.factory().opened().is_empty());
    }
}
