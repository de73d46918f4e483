//! Resolution orchestrator
//!
//! One resolution runs in three phases:
//!
//! 1. Under the entry's write lock: snapshot the entry, mark it `Processing`
//!    and bump its generation.
//! 2. Without any lock: derive the phrase (possibly via the keyword
//!    optimizer), fan out to every enabled source and pick candidates.
//! 3. Under the write lock again: apply the result. Concurrent resolutions
//!    of one entry resolve last-writer-wins unless stale results are
//!    configured to be discarded, in which case only the newest generation
//!    may apply.

use crate::error::{ResolveError, ResolveResult};
use crate::keywords::{KeywordOptimizer, KeywordStore, OptimizedKeywords};
use crate::phrase::{self, PhrasePlan};
use crate::selection::{placeholders, rank_hits, select_by_priority};
use crate::sources::{PageCursor, RegisteredSource, SourceFanOut, SourceHit, SourceSet};
use crate::types::{
    clamp_count, Candidate, MediaEntry, MediaKind, ResolutionResult, ResolutionStatus,
    ResolveOverrides, SharedEntry, MANUAL_SOURCE_ID,
};
use futures::future::join_all;
use mrp_common::config::{PhraseConfig, ResolverConfig, TomlConfig};
use mrp_common::Clock;
use reqwest::Url;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Phrase chosen for one resolution
#[derive(Debug, Clone, PartialEq, Eq)]
struct DerivedPhrase {
    phrase: String,
    /// Optimizer output to persist as the entry's keywords
    optimized: Option<OptimizedKeywords>,
}

/// Media resolution pipeline
pub struct Resolver {
    sources: SourceSet,
    optimizer: Arc<KeywordOptimizer>,
    phrase: PhraseConfig,
    settings: ResolverConfig,
    clock: Arc<dyn Clock>,
}

impl Resolver {
    pub fn new(sources: SourceSet, optimizer: Arc<KeywordOptimizer>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sources,
            optimizer,
            phrase: PhraseConfig::default(),
            settings: ResolverConfig::default(),
            clock,
        }
    }

    pub fn with_phrase_config(mut self, phrase: PhraseConfig) -> Self {
        self.phrase = phrase;
        self
    }

    pub fn with_settings(mut self, settings: ResolverConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Wire sources, keyword providers and settings from configuration
    pub fn from_config(config: &TomlConfig, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(KeywordStore::from_config(&config.keywords, clock.clone()));
        let optimizer = Arc::new(KeywordOptimizer::from_config(
            &config.keywords,
            &config.api_keys,
            store,
        ));
        let sources = SourceSet::from_config(&config.sources, &config.api_keys);

        info!(
            sources = ?sources.ids(),
            providers = ?optimizer.provider_names(),
            discard_stale = config.resolver.discard_stale_results,
            "Resolver configured"
        );

        Self::new(sources, optimizer, clock)
            .with_phrase_config(config.phrase.clone())
            .with_settings(config.resolver.clone())
    }

    pub fn optimizer(&self) -> &Arc<KeywordOptimizer> {
        &self.optimizer
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    fn prefix(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Image => &self.phrase.image_prefix,
            MediaKind::Video => &self.phrase.video_prefix,
        }
    }

    /// Resolve one entry: derive a phrase, query every source, apply the best
    /// candidates
    ///
    /// Never fails. When no source produces anything the entry receives
    /// placeholder candidates.
    pub async fn resolve(
        &self,
        entry: &SharedEntry,
        overrides: Option<&ResolveOverrides>,
    ) -> ResolutionResult {
        let (snapshot, generation) = {
            let mut guard = entry.write().await;
            guard.state.status = ResolutionStatus::Processing;
            guard.state.generation += 1;
            (guard.clone(), guard.state.generation)
        };

        let derived = match overrides.and_then(|o| o.phrase.as_deref()) {
            Some(phrase) => DerivedPhrase {
                phrase: phrase::safety_net(phrase),
                optimized: None,
            },
            None => self.derive_phrase(&snapshot).await,
        };
        let dispatch = phrase::normalize_for_dispatch(&derived.phrase);
        let count = overrides
            .and_then(|o| o.count)
            .map(clamp_count)
            .unwrap_or_else(|| snapshot.desired_count());

        debug!(
            entry = %snapshot.id,
            phrase = %dispatch,
            count,
            page = snapshot.state.page,
            "Resolving entry"
        );

        let fanout = SourceFanOut::new(self.sources.enabled_for(snapshot.kind));
        let cursor = PageCursor::new(snapshot.state.page);
        let used = snapshot.state.used_urls.to_set();
        let hits = fanout
            .query_all(&dispatch, snapshot.kind, snapshot.state.page, &used, &cursor)
            .await;

        let candidates = if count == 1 {
            select_by_priority(hits, &used).into_iter().collect()
        } else {
            self.diversify(&fanout, hits, count, &dispatch, snapshot.kind, &used)
                .await
        };

        let (candidates, placeholder) = if candidates.is_empty() {
            warn!(entry = %snapshot.id, phrase = %dispatch, "No source produced a candidate, using placeholders");
            (
                placeholders(&self.settings.placeholder_template, &dispatch, count),
                true,
            )
        } else if candidates.len() < count {
            let mut filled = candidates;
            let missing = count - filled.len();
            filled.extend(placeholders(&self.settings.placeholder_template, &dispatch, missing));
            (filled, false)
        } else {
            (candidates, false)
        };

        let page = cursor.get();
        let keyword_provider = derived.optimized.as_ref().map(|o| o.provider.clone());
        let mut result = ResolutionResult {
            entry_id: snapshot.id,
            phrase: dispatch,
            candidates: candidates.clone(),
            page,
            placeholder,
            keyword_provider,
            applied: false,
        };

        let mut guard = entry.write().await;
        if self.settings.discard_stale_results && guard.state.generation != generation {
            info!(
                entry = %snapshot.id,
                generation,
                current = guard.state.generation,
                "Discarding stale resolution result"
            );
            return result;
        }

        if let Some(optimized) = &derived.optimized {
            if guard.keywords.trim().is_empty() {
                guard.keywords = optimized.search_query.clone();
            }
        }
        let kind = guard.kind;
        guard
            .state
            .apply_resolution(candidates, page, kind, self.clock.now());
        result.applied = true;

        info!(
            entry = %snapshot.id,
            primary = result.primary().map(|c| c.url.as_str()).unwrap_or_default(),
            source = result.primary().map(|c| c.source_id.as_str()).unwrap_or_default(),
            candidates = result.candidates.len(),
            page,
            placeholder,
            "Entry resolved"
        );
        result
    }

    /// Resolve several entries concurrently, waiting for all of them
    pub async fn resolve_batch(
        &self,
        entries: &[SharedEntry],
        overrides: Option<&ResolveOverrides>,
    ) -> Vec<ResolutionResult> {
        info!(entries = entries.len(), "Resolving batch");
        join_all(entries.iter().map(|entry| self.resolve(entry, overrides))).await
    }

    /// Make a user-supplied URL the entry's primary reference
    ///
    /// The URL must be absolute http(s). The used-URL set, page cursor and
    /// candidate list are left untouched.
    pub async fn apply_candidate(&self, entry: &SharedEntry, url: &str) -> ResolveResult<()> {
        let url = validate_url(url)?;

        let mut guard = entry.write().await;
        let kind = guard.kind;
        guard
            .state
            .promote(Candidate::new(url.as_str(), MANUAL_SOURCE_ID), kind, self.clock.now());
        info!(entry = %guard.id, url = %url, "Manual reference applied");
        Ok(())
    }

    /// Promote one of the entry's generated candidates to primary
    pub async fn select_candidate(&self, entry: &SharedEntry, index: usize) -> ResolveResult<()> {
        let mut guard = entry.write().await;
        let len = guard.state.candidates.len();
        let candidate = guard
            .state
            .candidates
            .get(index)
            .cloned()
            .ok_or(ResolveError::CandidateOutOfRange { index, len })?;

        let kind = guard.kind;
        guard.state.used_urls.insert(candidate.url.clone());
        guard.state.promote(candidate, kind, self.clock.now());
        guard.state.selected_index = index;
        debug!(entry = %guard.id, index, "Candidate selected");
        Ok(())
    }

    /// Ask the optimizer for a different keyword string
    ///
    /// The entry's current keywords are passed as the phrase to avoid. On
    /// success they are replaced; on failure the entry is unchanged.
    pub async fn regenerate_keywords(&self, entry: &SharedEntry) -> Option<OptimizedKeywords> {
        let snapshot = entry.read().await.clone();
        let word = snapshot.word.trim();
        let description = match snapshot.description.trim() {
            "" => word,
            d => d,
        };
        if description.is_empty() {
            debug!(entry = %snapshot.id, "Nothing to regenerate keywords from");
            return None;
        }

        let avoid = Some(snapshot.keywords.trim()).filter(|k| !k.is_empty());
        let optimized = self
            .optimizer
            .optimize(description, Some(word).filter(|w| !w.is_empty()), avoid)
            .await?;

        let mut guard = entry.write().await;
        guard.keywords = optimized.search_query.clone();
        info!(
            entry = %guard.id,
            provider = %optimized.provider,
            cached = optimized.cached,
            keywords = %guard.keywords,
            "Keywords regenerated"
        );
        Some(optimized)
    }

    async fn derive_phrase(&self, entry: &MediaEntry) -> DerivedPhrase {
        match phrase::plan(entry, self.prefix(entry.kind)) {
            PhrasePlan::Ready(phrase) => DerivedPhrase {
                phrase,
                optimized: None,
            },
            PhrasePlan::Optimize {
                description,
                word,
                prefix,
            } => {
                let optimized = self
                    .optimizer
                    .optimize(&description, Some(word.as_str()).filter(|w| !w.is_empty()), None)
                    .await;
                let phrase = phrase::finish_optimized(
                    optimized.as_ref().map(|o| o.search_query.as_str()),
                    &word,
                    &prefix,
                );
                DerivedPhrase { phrase, optimized }
            }
        }
    }

    /// Build up to `count` candidates spread across sources
    ///
    /// Sources with a hit take turns in rank order: the first round uses the
    /// fan-out hits, later rounds ask the same sources again for URLs not yet
    /// used or picked. A source that runs dry drops out of the rotation.
    /// Fan-out hits that repeat a used URL only fill slots left over at the
    /// end.
    async fn diversify(
        &self,
        fanout: &SourceFanOut,
        hits: Vec<SourceHit>,
        count: usize,
        phrase: &str,
        kind: MediaKind,
        used: &HashSet<String>,
    ) -> Vec<Candidate> {
        let ranked = rank_hits(hits, used);
        let mut exclude = used.clone();
        let mut picked = Vec::with_capacity(count);
        let mut repeats = Vec::new();
        let mut rotation: Vec<(RegisteredSource, u32)> = Vec::new();

        for hit in ranked {
            if let Some(source) = fanout.sources().iter().find(|s| s.id() == hit.source_id) {
                rotation.push((source.clone(), hit.page));
            }
            if used.contains(&hit.candidate.url) {
                repeats.push(hit.candidate);
            } else if picked.len() < count {
                exclude.insert(hit.candidate.url.clone());
                picked.push(hit.candidate);
            }
        }
        rotation.sort_by(|(a, _), (b, _)| {
            a.descriptor
                .priority
                .cmp(&b.descriptor.priority)
                .then_with(|| a.id().cmp(b.id()))
        });

        while picked.len() < count && !rotation.is_empty() {
            let mut drained = Vec::new();
            for (i, (source, page)) in rotation.iter().enumerate() {
                if picked.len() == count {
                    break;
                }
                match SourceFanOut::query_more(source, phrase, kind, *page, &exclude).await {
                    Some(candidate) => {
                        exclude.insert(candidate.url.clone());
                        picked.push(candidate);
                    }
                    None => drained.push(i),
                }
            }
            for i in drained.into_iter().rev() {
                let (source, _) = rotation.remove(i);
                debug!(source = source.id(), "Source has no more candidates");
            }
        }

        let missing = count.saturating_sub(picked.len());
        picked.extend(repeats.into_iter().take(missing));
        picked
    }
}

fn validate_url(raw: &str) -> ResolveResult<Url> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| ResolveError::InvalidUrl(format!("{}: {}", trimmed, e)))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(ResolveError::InvalidUrl(trimmed.to_string())),
    }
}
