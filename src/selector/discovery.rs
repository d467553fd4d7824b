//! Selector discovery.
//!
//! Decides which [`SelectorGroup`] of a provider's catalog locates the
//! conversation turns on the rendered page.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::{catalog, SelectorGroup};
use crate::backend::PageSession;
use crate::dom::{self, Document};
use crate::error::{Error, Result};
use crate::provider::Provider;

/// Name recorded for a caller-supplied selector.
pub const OVERRIDE_GROUP: &str = "override";

/// The selector extraction will use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorChoice {
    /// Catalog group name, or [`OVERRIDE_GROUP`].
    pub group: &'static str,
    /// CSS selector list.
    pub selector: String,
}

impl SelectorChoice {
    fn from_group(group: &SelectorGroup) -> Self {
        Self {
            group: group.name,
            selector: group.combined(),
        }
    }

    /// Validate a caller-supplied selector.
    pub fn from_override(selector: &str) -> Result<Self> {
        if dom::is_valid_selector(selector) {
            Ok(Self {
                group: OVERRIDE_GROUP,
                selector: selector.trim().to_string(),
            })
        } else {
            Err(Error::InvalidSelector(selector.to_string()))
        }
    }
}

/// Discover the selector group on a live page.
///
/// Each group is polled until it matches or its slice of `budget` runs out.
/// When every group timed out, one last synchronous count across all groups
/// catches elements that appeared during the later waits.
pub async fn discover<S: PageSession>(
    session: &S,
    provider: Provider,
    budget: Duration,
    poll_interval: Duration,
) -> Result<SelectorChoice> {
    let groups = catalog(provider);
    let per_group = per_group_wait(budget, groups.len());

    for group in groups {
        let selector = group.combined();
        let started = Instant::now();
        loop {
            let count = poll_count(session, &selector).await?;
            if count > 0 {
                debug!(%provider, group = group.name, count, "selector group matched");
                return Ok(SelectorChoice::from_group(group));
            }
            let elapsed = started.elapsed();
            if elapsed >= per_group {
                debug!(%provider, group = group.name, "selector group timed out");
                break;
            }
            tokio::time::sleep(poll_interval.min(per_group - elapsed)).await;
        }
    }

    for group in groups {
        if poll_count(session, &group.combined()).await? > 0 {
            debug!(%provider, group = group.name, "selector group matched on final scan");
            return Ok(SelectorChoice::from_group(group));
        }
    }

    Err(Error::SelectorNotFound {
        provider,
        tried: groups.len(),
    })
}

/// Count matches, reading a transient browser failure as "none yet".
///
/// Challenge redirects and late hydration tear down the execution context
/// between polls; the next poll sees the settled page.
async fn poll_count<S: PageSession>(session: &S, selector: &str) -> Result<usize> {
    match session.count_matches(selector).await {
        Ok(count) => Ok(count),
        Err(e) if e.is_transient() => {
            debug!(selector, error = %e, "selector poll failed, retrying");
            Ok(0)
        }
        Err(e) => Err(e),
    }
}

/// Discover the selector group on a parsed snapshot.
///
/// Returns the first catalog group with at least one match, so the same
/// snapshot always yields the same group.
pub fn discover_in_document(doc: &Document, provider: Provider) -> Result<SelectorChoice> {
    let groups = catalog(provider);
    groups
        .iter()
        .find(|group| dom::count_matches(doc, &group.combined()) > 0)
        .map(|group| {
            debug!(%provider, group = group.name, "selector group matched snapshot");
            SelectorChoice::from_group(group)
        })
        .ok_or(Error::SelectorNotFound {
            provider,
            tried: groups.len(),
        })
}

fn per_group_wait(budget: Duration, groups: usize) -> Duration {
    match u32::try_from(groups) {
        Ok(n) if n > 0 => budget / n,
        _ => budget,
    }
}
