//! Escalation ladder as a pure transition function.

use serde::Serialize;

use crate::backend::BackendKind;
use crate::error::Error;
use crate::patterns::BLOCKING_NAVIGATION_ERROR;

/// Position on the escalation ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Idle,
    ScriptedHeadless,
    ScriptedHeadful,
    AttachedBackend,
    Success,
    Failure(FailureKind),
}

/// Why the ladder ended in [`State::Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The last stage was blocked and nothing stronger was left.
    Exhausted,
    /// Selectors missing on a provider that does not hide behind challenges.
    SelectorNotFound,
    /// The next rung (attach mode) is not available here.
    UnsupportedEscalation,
    /// A non-recoverable error.
    Fatal,
}

/// What a stage observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Start,
    Extracted,
    ChallengeBlocked,
    BlockingNavigation,
    SelectorsMissing,
    Fatal,
}

impl Signal {
    /// Classify a stage error.
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::ChallengeBlocked { .. } => Self::ChallengeBlocked,
            // Retries already ran; a page that keeps hanging is being held back.
            Error::NavigationTimeout { .. } => Self::BlockingNavigation,
            Error::Navigation(message) if BLOCKING_NAVIGATION_ERROR.is_match(message) => {
                Self::BlockingNavigation
            }
            Error::SelectorNotFound { .. } => Self::SelectorsMissing,
            _ => Self::Fatal,
        }
    }
}

/// Facts the transition function needs besides state and signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Policy {
    /// Provider hides its pages behind bot challenges.
    pub defended: bool,
    pub start_headful: bool,
    pub force_attach: bool,
    /// Attach mode can run: enabled, endpoint configured, someone to
    /// solve challenges.
    pub attach_available: bool,
}

impl State {
    /// Backend used while in this state, if it runs a stage.
    #[must_use]
    pub const fn backend(self) -> Option<BackendKind> {
        match self {
            Self::ScriptedHeadless => Some(BackendKind::Scripted { headless: true }),
            Self::ScriptedHeadful => Some(BackendKind::Scripted { headless: false }),
            Self::AttachedBackend => Some(BackendKind::Attached),
            Self::Idle | Self::Success | Self::Failure(_) => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure(_))
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ScriptedHeadless => "scripted_headless",
            Self::ScriptedHeadful => "scripted_headful",
            Self::AttachedBackend => "attached_backend",
            Self::Success => "success",
            Self::Failure(_) => "failure",
        }
    }
}

/// Next state of the ladder.
#[must_use]
pub const fn transition(state: State, signal: Signal, policy: &Policy) -> State {
    use Signal as S;
    use State as St;

    match (state, signal) {
        (St::Success | St::Failure(_), _) => state,

        (St::Idle, S::Start) => {
            if policy.force_attach {
                enter_attached(policy)
            } else if policy.start_headful {
                St::ScriptedHeadful
            } else {
                St::ScriptedHeadless
            }
        }
        (St::Idle, _) => state,

        (_, S::Extracted) => St::Success,
        (_, S::Fatal) => St::Failure(FailureKind::Fatal),
        (_, S::Start) => state,

        (St::ScriptedHeadless, S::ChallengeBlocked | S::BlockingNavigation) => St::ScriptedHeadful,
        (St::ScriptedHeadless, S::SelectorsMissing) => {
            if policy.defended {
                St::ScriptedHeadful
            } else {
                St::Failure(FailureKind::SelectorNotFound)
            }
        }

        (St::ScriptedHeadful, S::ChallengeBlocked | S::BlockingNavigation) => enter_attached(policy),
        (St::ScriptedHeadful, S::SelectorsMissing) => {
            if policy.defended {
                enter_attached(policy)
            } else {
                St::Failure(FailureKind::SelectorNotFound)
            }
        }

        (St::AttachedBackend, S::SelectorsMissing) => St::Failure(FailureKind::SelectorNotFound),
        (St::AttachedBackend, _) => St::Failure(FailureKind::Exhausted),
    }
}

const fn enter_attached(policy: &Policy) -> State {
    if policy.attach_available {
        State::AttachedBackend
    } else {
        State::Failure(FailureKind::UnsupportedEscalation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;

    const DEFENDED: Policy = Policy {
        defended: true,
        start_headful: false,
        force_attach: false,
        attach_available: true,
    };

    #[test]
    fn test_start_picks_first_rung() {
        assert_eq!(transition(State::Idle, Signal::Start, &DEFENDED), State::ScriptedHeadless);

        let headful = Policy {
            start_headful: true,
            ..DEFENDED
        };
        assert_eq!(transition(State::Idle, Signal::Start, &headful), State::ScriptedHeadful);

        let attach = Policy {
            force_attach: true,
            ..DEFENDED
        };
        assert_eq!(transition(State::Idle, Signal::Start, &attach), State::AttachedBackend);
    }

    #[test]
    fn test_full_ladder_on_challenges() {
        let mut state = transition(State::Idle, Signal::Start, &DEFENDED);
        let mut visited = vec![state];
        while !state.is_terminal() {
            state = transition(state, Signal::ChallengeBlocked, &DEFENDED);
            visited.push(state);
        }
        assert_eq!(
            visited,
            vec![
                State::ScriptedHeadless,
                State::ScriptedHeadful,
                State::AttachedBackend,
                State::Failure(FailureKind::Exhausted),
            ]
        );
    }

    #[test]
    fn test_blocking_navigation_escalates() {
        assert_eq!(
            transition(State::ScriptedHeadless, Signal::BlockingNavigation, &DEFENDED),
            State::ScriptedHeadful
        );
    }

    #[test]
    fn test_missing_selectors_depend_on_defense() {
        let open = Policy {
            defended: false,
            ..DEFENDED
        };
        assert_eq!(
            transition(State::ScriptedHeadless, Signal::SelectorsMissing, &open),
            State::Failure(FailureKind::SelectorNotFound)
        );
        assert_eq!(
            transition(State::ScriptedHeadful, Signal::SelectorsMissing, &DEFENDED),
            State::AttachedBackend
        );
    }

    #[test]
    fn test_attach_unavailable_fails() {
        let no_attach = Policy {
            attach_available: false,
            ..DEFENDED
        };
        assert_eq!(
            transition(State::ScriptedHeadful, Signal::ChallengeBlocked, &no_attach),
            State::Failure(FailureKind::UnsupportedEscalation)
        );
        let forced = Policy {
            force_attach: true,
            ..no_attach
        };
        assert_eq!(
            transition(State::Idle, Signal::Start, &forced),
            State::Failure(FailureKind::UnsupportedEscalation)
        );
    }

    #[test]
    fn test_extracted_and_fatal_from_any_stage() {
        for state in [State::ScriptedHeadless, State::ScriptedHeadful, State::AttachedBackend] {
            assert_eq!(transition(state, Signal::Extracted, &DEFENDED), State::Success);
            assert_eq!(
                transition(state, Signal::Fatal, &DEFENDED),
                State::Failure(FailureKind::Fatal)
            );
        }
    }

    #[test]
    fn test_terminal_states_absorb() {
        assert_eq!(transition(State::Success, Signal::Fatal, &DEFENDED), State::Success);
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(
            Signal::from_error(&Error::ChallengeBlocked {
                provider: Provider::Claude
            }),
            Signal::ChallengeBlocked
        );
        assert_eq!(
            Signal::from_error(&Error::Navigation("net::ERR_HTTP2_PROTOCOL_ERROR".into())),
            Signal::BlockingNavigation
        );
        assert_eq!(
            Signal::from_error(&Error::Navigation("net::ERR_NAME_NOT_RESOLVED".into())),
            Signal::Fatal
        );
        assert_eq!(
            Signal::from_error(&Error::NavigationTimeout {
                url: "u".into(),
                timeout_ms: 1
            }),
            Signal::BlockingNavigation
        );
        assert_eq!(Signal::from_error(&Error::NoMessagesFound), Signal::Fatal);
    }
}
