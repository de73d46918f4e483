//! Core types for the media resolution pipeline
//!
//! A [`MediaEntry`] is the unit of work. Its user-editable settings (word,
//! description, keywords, mode flags, desired count) are set by the caller;
//! its [`ResolutionState`] is mutated only by the resolver or by an explicit
//! manual override.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Smallest and largest number of candidates generated per resolution
pub const MIN_CANDIDATES: u8 = 1;
pub const MAX_CANDIDATES: u8 = 4;

/// Source id stamped on placeholder candidates
pub const PLACEHOLDER_SOURCE_ID: &str = "ai-generated";

/// Source id stamped on user-picked candidates
pub const MANUAL_SOURCE_ID: &str = "manual";

/// Entry handle shared between the caller's store and concurrent resolutions
pub type SharedEntry = Arc<RwLock<MediaEntry>>;

/// Media kind requested by an entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the search phrase is obtained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordMode {
    /// Keywords come from the text-optimization providers
    Ai,
    /// Keywords are typed by the user (or absent)
    #[default]
    Manual,
}

/// Resolution lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStatus {
    #[default]
    Pending,
    Processing,
    Completed,
}

/// One media reference returned by a source (or synthesized as a placeholder)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Direct media URL
    pub url: String,
    /// Id of the source that produced it
    pub source_id: String,
    /// Landing page on the source site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,
}

impl Candidate {
    pub fn new(url: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            source_id: source_id.into(),
            source_url: None,
            author_name: None,
            author_url: None,
        }
    }

    pub fn with_source_url(mut self, source_url: impl Into<String>) -> Self {
        self.source_url = Some(source_url.into());
        self
    }

    pub fn with_author(mut self, name: impl Into<String>, url: Option<String>) -> Self {
        self.author_name = Some(name.into());
        self.author_url = url;
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.source_id == PLACEHOLDER_SOURCE_ID
    }
}

/// A displaced primary reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub reference: Candidate,
    /// Media kind the entry had when this reference was replaced
    pub kind: MediaKind,
    pub replaced_at: DateTime<Utc>,
}

/// Append-only set of URLs an entry has used as primary
///
/// Keeps insertion order for stable serialization; there is no removal API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct UsedUrls {
    order: Vec<String>,
    index: HashSet<String>,
}

impl UsedUrls {
    /// Record a URL; returns false if it was already present
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.index.contains(&url) {
            return false;
        }
        self.index.insert(url.clone());
        self.order.push(url);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains(url)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Owned snapshot for lookups that outlive a lock guard
    pub fn to_set(&self) -> HashSet<String> {
        self.index.clone()
    }
}

impl From<Vec<String>> for UsedUrls {
    fn from(urls: Vec<String>) -> Self {
        let mut used = UsedUrls::default();
        for url in urls {
            used.insert(url);
        }
        used
    }
}

impl From<UsedUrls> for Vec<String> {
    fn from(used: UsedUrls) -> Self {
        used.order
    }
}

fn first_page() -> u32 {
    1
}

/// Resolution-state fields owned by the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionState {
    #[serde(default)]
    pub primary: Option<Candidate>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub selected_index: usize,
    #[serde(default)]
    pub used_urls: UsedUrls,
    /// Page cursor shared by every source queried for this entry (>= 1)
    #[serde(default = "first_page")]
    pub page: u32,
    /// Displaced primaries, most recently replaced first
    #[serde(default)]
    pub history: VecDeque<HistoryItem>,
    #[serde(default)]
    pub status: ResolutionStatus,
    /// Bumped each time a resolution starts
    #[serde(default)]
    pub generation: u64,
}

impl Default for ResolutionState {
    fn default() -> Self {
        Self {
            primary: None,
            candidates: Vec::new(),
            selected_index: 0,
            used_urls: UsedUrls::default(),
            page: 1,
            history: VecDeque::new(),
            status: ResolutionStatus::Pending,
            generation: 0,
        }
    }
}

impl ResolutionState {
    /// Make `reference` the primary, pushing the displaced one onto history
    ///
    /// History never holds the current primary: re-promoting a URL removes
    /// its older history record, and promoting the current URL again does not
    /// push anything.
    pub fn promote(&mut self, reference: Candidate, kind: MediaKind, now: DateTime<Utc>) {
        if let Some(previous) = self.primary.take() {
            if previous.url != reference.url {
                self.history.push_front(HistoryItem {
                    reference: previous,
                    kind,
                    replaced_at: now,
                });
            }
        }
        self.history.retain(|item| item.reference.url != reference.url);
        self.primary = Some(reference);
    }

    /// Record a completed automatic resolution
    ///
    /// The first candidate becomes primary and its URL is marked used before
    /// the swap. The page cursor is overwritten with `page`.
    pub fn apply_resolution(
        &mut self,
        candidates: Vec<Candidate>,
        page: u32,
        kind: MediaKind,
        now: DateTime<Utc>,
    ) {
        if let Some(first) = candidates.first().cloned() {
            self.used_urls.insert(first.url.clone());
            self.promote(first, kind, now);
        }
        self.candidates = candidates;
        self.selected_index = 0;
        self.page = page.max(1);
        self.status = ResolutionStatus::Completed;
    }
}

/// Unit of work needing a media match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub id: Uuid,
    /// Subject word
    #[serde(default)]
    pub word: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Space-separated keyword string (may be empty)
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub kind: MediaKind,
    #[serde(default)]
    pub mode: KeywordMode,
    #[serde(default)]
    pub isolated_background: bool,
    /// Desired candidate count; clamped to 1..=4 on use
    #[serde(default = "default_candidate_count")]
    pub candidate_count: u8,
    #[serde(default)]
    pub state: ResolutionState,
}

fn default_candidate_count() -> u8 {
    MIN_CANDIDATES
}

impl MediaEntry {
    pub fn new(word: impl Into<String>, description: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            word: word.into(),
            description: description.into(),
            keywords: String::new(),
            kind,
            mode: KeywordMode::Manual,
            isolated_background: false,
            candidate_count: MIN_CANDIDATES,
            state: ResolutionState::default(),
        }
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = keywords.into();
        self
    }

    pub fn with_mode(mut self, mode: KeywordMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_isolated_background(mut self, isolated: bool) -> Self {
        self.isolated_background = isolated;
        self
    }

    pub fn with_candidate_count(mut self, count: u8) -> Self {
        self.candidate_count = count;
        self
    }

    /// Desired candidate count clamped to the supported range
    pub fn desired_count(&self) -> usize {
        clamp_count(self.candidate_count)
    }

    /// Wrap for sharing with the resolver
    pub fn into_shared(self) -> SharedEntry {
        Arc::new(RwLock::new(self))
    }
}

pub(crate) fn clamp_count(count: u8) -> usize {
    count.clamp(MIN_CANDIDATES, MAX_CANDIDATES) as usize
}

/// Per-call overrides for [`crate::resolver::Resolver::resolve`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOverrides {
    /// Use this phrase instead of deriving one
    pub phrase: Option<String>,
    /// Use this candidate count instead of the entry's
    pub count: Option<u8>,
}

/// Outcome of one resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    pub entry_id: Uuid,
    /// Phrase sent to the sources (after normalization)
    pub phrase: String,
    pub candidates: Vec<Candidate>,
    /// Page cursor after this resolution
    pub page: u32,
    /// True when every candidate is a synthesized placeholder
    pub placeholder: bool,
    /// Provider that produced optimized keywords, if one was called
    pub keyword_provider: Option<String>,
    /// False when the result was discarded as stale
    pub applied: bool,
}

impl ResolutionResult {
    pub fn primary(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}
