//! Openverse source (openly licensed images)
//!
//! `GET /v1/images/`; anonymous access, page size capped at 20.

use super::http::{build_client, get_json, rate_limiter, HttpSettings};
use super::{Capabilities, MediaSource, SourceDescriptor, SourceError};
use crate::types::{Candidate, MediaKind};
use async_trait::async_trait;
use governor::DefaultDirectRateLimiter;
use reqwest::Client;
use serde::Deserialize;

const OPENVERSE_BASE_URL: &str = "https://api.openverse.org";
const MAX_ANONYMOUS_PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: Option<String>,
    foreign_landing_url: Option<String>,
    creator: Option<String>,
    creator_url: Option<String>,
}

pub struct OpenverseSource {
    client: Client,
    base_url: String,
    page_size: u32,
    limiter: DefaultDirectRateLimiter,
}

impl OpenverseSource {
    pub fn new(settings: &HttpSettings) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(settings)?,
            base_url: OPENVERSE_BASE_URL.to_string(),
            page_size: settings.per_page.min(MAX_ANONYMOUS_PAGE_SIZE),
            limiter: rate_limiter(settings.requests_per_second),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn candidate(image: Image) -> Option<Candidate> {
        let mut candidate = Candidate::new(image.url?, "openverse");
        if let Some(landing) = image.foreign_landing_url {
            candidate = candidate.with_source_url(landing);
        }
        if let Some(creator) = image.creator {
            candidate = candidate.with_author(creator, image.creator_url);
        }
        Some(candidate)
    }
}

#[async_trait]
impl MediaSource for OpenverseSource {
    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            id: "openverse",
            capabilities: Capabilities::IMAGE,
            priority: 4,
        }
    }

    async fn search_page(
        &self,
        phrase: &str,
        kind: MediaKind,
        page: u32,
    ) -> Result<Vec<Candidate>, SourceError> {
        if kind != MediaKind::Image {
            return Err(SourceError::UnsupportedKind(kind));
        }

        let url = format!("{}/v1/images/", self.base_url.trim_end_matches('/'));
        tracing::debug!(source = "openverse", %phrase, page, "Searching");

        let request = self.client.get(&url).query(&[
            ("q", phrase.to_string()),
            ("page", page.to_string()),
            ("page_size", self.page_size.to_string()),
        ]);

        Ok(get_json::<SearchPage>("openverse", &self.limiter, request)
            .await?
            .results
            .into_iter()
            .filter_map(Self::candidate)
            .collect())
    }
}
