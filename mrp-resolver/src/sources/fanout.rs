//! Concurrent source fan-out
//!
//! Queries every enabled source for one entry at once and waits for all of
//! them. Per-source error isolation: a failing source counts as "no
//! candidate" and never affects its siblings.
//!
//! Page exhaustion: when page P yields nothing unused, the source retries
//! page P+1 once without excluding used URLs (an unused result on P+1 is
//! still preferred) and writes P+1 into the entry's shared [`PageCursor`].
//! Sources race on that write; the last one to finish wins.

use super::{FetchOutcome, RegisteredSource};
use crate::types::{Candidate, MediaKind};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

/// Page cursor shared by all sources of one resolution
#[derive(Debug)]
pub struct PageCursor {
    page: AtomicU32,
}

impl PageCursor {
    pub fn new(page: u32) -> Self {
        Self {
            page: AtomicU32::new(page.max(1)),
        }
    }

    /// Unconditional store; concurrent writers race and the last store wins
    pub fn set(&self, page: u32) {
        self.page.store(page.max(1), Ordering::SeqCst);
    }

    pub fn get(&self) -> u32 {
        self.page.load(Ordering::SeqCst)
    }
}

/// One candidate returned by one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHit {
    pub source_id: &'static str,
    pub priority: u32,
    pub candidate: Candidate,
    /// Page the candidate came from
    pub page: u32,
}

/// First result not in `used`, else the first result
///
/// The next-page retry does not exclude used URLs, but an unused one on
/// that page still wins over a repeat.
fn first_preferring_unused(results: Vec<Candidate>, used: &HashSet<String>) -> Option<Candidate> {
    let index = results
        .iter()
        .position(|c| !used.contains(&c.url))
        .unwrap_or(0);
    results.into_iter().nth(index)
}

/// Wait-all executor over a set of sources
pub struct SourceFanOut {
    sources: Vec<RegisteredSource>,
}

impl SourceFanOut {
    pub fn new(sources: Vec<RegisteredSource>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[RegisteredSource] {
        &self.sources
    }

    /// Query all sources concurrently and collect their hits
    ///
    /// Hits come back in source registration order, not finishing order.
    pub async fn query_all(
        &self,
        phrase: &str,
        kind: MediaKind,
        page: u32,
        used: &HashSet<String>,
        cursor: &PageCursor,
    ) -> Vec<SourceHit> {
        let futures = self
            .sources
            .iter()
            .map(|source| Self::query_one(source, phrase, kind, page, used, cursor));

        join_all(futures).await.into_iter().flatten().collect()
    }

    async fn query_one(
        source: &RegisteredSource,
        phrase: &str,
        kind: MediaKind,
        page: u32,
        used: &HashSet<String>,
        cursor: &PageCursor,
    ) -> Option<SourceHit> {
        let id = source.id();
        let hit = |candidate: Candidate, page: u32| SourceHit {
            source_id: id,
            priority: source.descriptor.priority,
            candidate,
            page,
        };

        match source.source.fetch_page(phrase, kind, page, used).await {
            Ok(FetchOutcome::Found(candidate)) => {
                debug!(source = id, page, url = %candidate.url, "Source returned candidate");
                return Some(hit(candidate, page));
            }
            Ok(FetchOutcome::Exhausted) => {
                debug!(source = id, page, "Page exhausted, advancing");
            }
            Err(e) => {
                warn!(source = id, page, error = %e, "Source query failed (per-source error isolation)");
                return None;
            }
        }

        let next = page.saturating_add(1);
        let outcome = source.source.search_page(phrase, kind, next).await;
        cursor.set(next);

        match outcome {
            Ok(results) => match first_preferring_unused(results, used) {
                Some(candidate) => {
                    debug!(
                        source = id,
                        page = next,
                        url = %candidate.url,
                        reused = used.contains(&candidate.url),
                        "Source returned candidate"
                    );
                    Some(hit(candidate, next))
                }
                None => {
                    debug!(source = id, page = next, "Next page exhausted too");
                    None
                }
            },
            Err(e) => {
                warn!(source = id, page = next, error = %e, "Source query failed (per-source error isolation)");
                None
            }
        }
    }

    /// Ask one source for another candidate not in `exclude`
    ///
    /// Used to diversify multi-candidate results. Tries `page`, then
    /// `page + 1`, both with the full exclusion set. Does not move the
    /// entry's page cursor.
    pub async fn query_more(
        source: &RegisteredSource,
        phrase: &str,
        kind: MediaKind,
        page: u32,
        exclude: &HashSet<String>,
    ) -> Option<Candidate> {
        for attempt in [page, page.saturating_add(1)] {
            match source.source.fetch_page(phrase, kind, attempt, exclude).await {
                Ok(FetchOutcome::Found(candidate)) => return Some(candidate),
                Ok(FetchOutcome::Exhausted) => continue,
                Err(e) => {
                    warn!(source = source.id(), page = attempt, error = %e, "Follow-up query failed");
                    return None;
                }
            }
        }
        None
    }
}
