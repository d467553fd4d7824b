//! Timeout budget shared by the escalation stages.

use std::time::Duration;

use tokio::time::Instant;

use super::state::State;
use crate::error::{Error, Result};

/// Percent of the overall budget a scripted stage may use.
const SCRIPTED_STAGE_PERCENT: u32 = 35;

/// Percent of a stage budget navigation may use.
const NAVIGATION_PERCENT: u32 = 40;

/// Percent of a stage budget selector discovery may use.
const DISCOVERY_PERCENT: u32 = 40;

fn percent(duration: Duration, percent: u32) -> Duration {
    duration * percent / 100
}

/// Overall budget for one scrape.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    started_at: Instant,
    total: Duration,
}

impl Budget {
    #[must_use]
    pub fn new(total: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            total,
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.total.saturating_sub(self.elapsed())
    }

    /// Budget for the stage run in `state`.
    ///
    /// Scripted stages get a fixed share of the total, clipped to what is
    /// left; the attached stage gets everything that is left.
    pub fn stage(&self, state: State) -> Result<StageBudget> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return Err(Error::BudgetExhausted {
                stage: state.name().to_string(),
            });
        }
        let allotted = match state {
            State::ScriptedHeadless | State::ScriptedHeadful => {
                percent(self.total, SCRIPTED_STAGE_PERCENT).min(remaining)
            }
            _ => remaining,
        };
        Ok(StageBudget::new(allotted))
    }
}

/// Budget for one escalation stage.
#[derive(Debug, Clone, Copy)]
pub struct StageBudget {
    started_at: Instant,
    total: Duration,
}

impl StageBudget {
    #[must_use]
    pub fn new(total: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            total,
        }
    }

    #[must_use]
    pub const fn total(&self) -> Duration {
        self.total
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.total.saturating_sub(self.started_at.elapsed())
    }

    /// Navigation allowance.
    #[must_use]
    pub fn navigation(&self) -> Duration {
        percent(self.total, NAVIGATION_PERCENT).min(self.remaining())
    }

    /// Selector discovery allowance.
    #[must_use]
    pub fn discovery(&self) -> Duration {
        percent(self.total, DISCOVERY_PERCENT).min(self.remaining())
    }

    /// Fail with [`Error::BudgetExhausted`] when nothing is left.
    pub fn ensure_left(&self, stage: &str) -> Result<()> {
        if self.remaining().is_zero() {
            Err(Error::BudgetExhausted {
                stage: stage.to_string(),
            })
        } else {
            Ok(())
        }
    }
}
