//! Media source adapters
//!
//! Every external media-search collaborator implements [`MediaSource`]. An
//! adapter only knows how to fetch one page of results; excluding used URLs
//! and the page-exhaustion retry are shared behaviour (see [`MediaSource::fetch_page`]
//! and [`fanout`]).
//!
//! # Sources
//! | id        | image | video | default rank |
//! |-----------|-------|-------|--------------|
//! | pexels    | yes   | yes   | 1            |
//! | unsplash  | yes   | no    | 2            |
//! | pixabay   | yes   | yes   | 3            |
//! | openverse | yes   | no    | 4            |
//! | giphy     | no    | yes   | 5            |

pub mod fanout;
pub mod giphy;
pub mod http;
pub mod openverse;
pub mod pexels;
pub mod pixabay;
pub mod unsplash;

pub use fanout::{PageCursor, SourceFanOut, SourceHit};

use crate::types::{Candidate, MediaKind};
use async_trait::async_trait;
use mrp_common::config::{ApiKeys, SourcesConfig};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Source adapter errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported media kind: {0}")]
    UnsupportedKind(MediaKind),
}

/// Media kinds a source can return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub image: bool,
    pub video: bool,
}

impl Capabilities {
    pub const IMAGE: Capabilities = Capabilities { image: true, video: false };
    pub const VIDEO: Capabilities = Capabilities { image: false, video: true };
    pub const BOTH: Capabilities = Capabilities { image: true, video: true };

    pub fn supports(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Image => self.image,
            MediaKind::Video => self.video,
        }
    }
}

/// Static description of a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub id: &'static str,
    pub capabilities: Capabilities,
    /// Rank used for single-candidate selection (lower wins)
    pub priority: u32,
}

/// Result of asking a source for one unused candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(Candidate),
    /// Page had no results, or every result was excluded
    Exhausted,
}

/// An external media-search collaborator
#[async_trait]
pub trait MediaSource: Send + Sync {
    fn descriptor(&self) -> SourceDescriptor;

    /// Raw results of one page, in the source's own order
    async fn search_page(
        &self,
        phrase: &str,
        kind: MediaKind,
        page: u32,
    ) -> Result<Vec<Candidate>, SourceError>;

    /// First result of `page` whose URL is not in `exclude`
    async fn fetch_page(
        &self,
        phrase: &str,
        kind: MediaKind,
        page: u32,
        exclude: &HashSet<String>,
    ) -> Result<FetchOutcome, SourceError> {
        let results = self.search_page(phrase, kind, page).await?;
        Ok(results
            .into_iter()
            .find(|c| !exclude.contains(&c.url))
            .map(FetchOutcome::Found)
            .unwrap_or(FetchOutcome::Exhausted))
    }
}

/// A source with its effective priority rank
#[derive(Clone)]
pub struct RegisteredSource {
    pub source: Arc<dyn MediaSource>,
    pub descriptor: SourceDescriptor,
}

impl RegisteredSource {
    pub fn new(source: Arc<dyn MediaSource>) -> Self {
        let descriptor = source.descriptor();
        Self { source, descriptor }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.descriptor.priority = priority;
        self
    }

    pub fn id(&self) -> &'static str {
        self.descriptor.id
    }
}

/// All constructed sources plus the per-kind selection
#[derive(Clone, Default)]
pub struct SourceSet {
    sources: Vec<RegisteredSource>,
    image_selection: Option<Vec<String>>,
    video_selection: Option<Vec<String>>,
}

impl SourceSet {
    /// Every registered source is selected for each kind it supports
    pub fn new(sources: Vec<RegisteredSource>) -> Self {
        Self {
            sources,
            image_selection: None,
            video_selection: None,
        }
    }

    /// Restrict the sources queried for `kind` to `ids`
    pub fn with_selection(mut self, kind: MediaKind, ids: Vec<String>) -> Self {
        match kind {
            MediaKind::Image => self.image_selection = Some(ids),
            MediaKind::Video => self.video_selection = Some(ids),
        }
        self
    }

    /// Build every source that has the credentials it needs
    pub fn from_config(config: &SourcesConfig, api_keys: &ApiKeys) -> Self {
        let settings = http::HttpSettings::from_config(config);
        let mut sources: Vec<Arc<dyn MediaSource>> = Vec::new();

        if let Some(key) = key_for(api_keys, "pexels") {
            push_source(&mut sources, "pexels", pexels::PexelsSource::new(key, &settings));
        }
        if let Some(key) = key_for(api_keys, "unsplash") {
            push_source(&mut sources, "unsplash", unsplash::UnsplashSource::new(key, &settings));
        }
        if let Some(key) = key_for(api_keys, "pixabay") {
            push_source(&mut sources, "pixabay", pixabay::PixabaySource::new(key, &settings));
        }
        push_source(&mut sources, "openverse", openverse::OpenverseSource::new(&settings));
        if let Some(key) = key_for(api_keys, "giphy") {
            push_source(&mut sources, "giphy", giphy::GiphySource::new(key, &settings));
        }

        let registered = sources
            .into_iter()
            .map(|source| {
                let registered = RegisteredSource::new(source);
                match config.priority.get(registered.id()) {
                    Some(&rank) => registered.with_priority(rank),
                    None => registered,
                }
            })
            .collect();

        SourceSet::new(registered)
            .with_selection(MediaKind::Image, config.image.clone())
            .with_selection(MediaKind::Video, config.video.clone())
    }

    /// Sources queried for `kind`: selected and capable
    pub fn enabled_for(&self, kind: MediaKind) -> Vec<RegisteredSource> {
        let selection = match kind {
            MediaKind::Image => self.image_selection.as_ref(),
            MediaKind::Video => self.video_selection.as_ref(),
        };

        self.sources
            .iter()
            .filter(|s| s.descriptor.capabilities.supports(kind))
            .filter(|s| selection.map_or(true, |ids| ids.iter().any(|id| id == s.id())))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.id()).collect()
    }
}

fn key_for(api_keys: &ApiKeys, id: &str) -> Option<String> {
    let key = api_keys.resolve(id);
    if key.is_none() {
        info!(source = id, "No API key configured, source disabled");
    }
    key
}

fn push_source<S: MediaSource + 'static>(
    sources: &mut Vec<Arc<dyn MediaSource>>,
    id: &str,
    built: Result<S, SourceError>,
) {
    match built {
        Ok(source) => sources.push(Arc::new(source)),
        Err(e) => warn!(source = id, error = %e, "Source unavailable"),
    }
}

// ============================================================================
// Mock Source for Testing
// ============================================================================


#[cfg(test)]
mod tests {
    use super::mock::MockSource;
    use super::*;

    #[tokio::test]
    async fn test_fetch_page_skips_excluded() {
        let source = MockSource::new("a", 1).page(1, &["u1", "u2"]);
        let exclude: HashSet<String> = ["u1".to_string()].into_iter().collect();

        let outcome = source.fetch_page("p", MediaKind::Image, 1, &exclude).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Found(Candidate::new("u2", "a")));
    }

    #[tokio::test]
    async fn test_fetch_page_all_excluded_is_exhausted() {
        let source = MockSource::new("a", 1).page(1, &["u1"]);
        let exclude: HashSet<String> = ["u1".to_string()].into_iter().collect();

        let outcome = source.fetch_page("p", MediaKind::Image, 1, &exclude).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Exhausted);
    }

    #[tokio::test]
    async fn test_fetch_page_empty_page_is_exhausted() {
        let source = MockSource::new("a", 1);
        let outcome = source
            .fetch_page("p", MediaKind::Image, 1, &HashSet::new())
            .await
            .unwrap();
        assert_eq!(outcome, FetchOutcome::Exhausted);
    }

    #[test]
    fn test_enabled_for_filters_capability_and_selection() {
        let set = SourceSet::new(vec![
            RegisteredSource::new(Arc::new(MockSource::new("both", 1))),
            RegisteredSource::new(Arc::new(
                MockSource::new("image-only", 2).capabilities(Capabilities::IMAGE),
            )),
            RegisteredSource::new(Arc::new(
                MockSource::new("video-only", 3).capabilities(Capabilities::VIDEO),
            )),
        ])
        .with_selection(MediaKind::Image, vec!["image-only".to_string(), "video-only".to_string()]);

        let image: Vec<_> = set.enabled_for(MediaKind::Image).iter().map(|s| s.id()).collect();
        assert_eq!(image, vec!["image-only"]);

        let video: Vec<_> = set.enabled_for(MediaKind::Video).iter().map(|s| s.id()).collect();
        assert_eq!(video, vec!["both", "video-only"]);
    }

    #[test]
    fn test_priority_override() {
        let registered = RegisteredSource::new(Arc::new(MockSource::new("a", 7))).with_priority(0);
        assert_eq!(registered.descriptor.priority, 0);
    }

    #[test]
    fn test_from_config_without_keys_keeps_keyless_source() {
        let set = SourceSet::from_config(&SourcesConfig::default(), &ApiKeys::default());
        assert!(set.ids().contains(&"openverse"));
    }
}
