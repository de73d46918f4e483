//! Unsplash source (photos only)
//!
//! `GET /search/photos`, authenticated with `Authorization: Client-ID <key>`.

use super::http::{build_client, get_json, rate_limiter, HttpSettings};
use super::{Capabilities, MediaSource, SourceDescriptor, SourceError};
use crate::types::{Candidate, MediaKind};
use async_trait::async_trait;
use governor::DefaultDirectRateLimiter;
use reqwest::Client;
use serde::Deserialize;

const UNSPLASH_BASE_URL: &str = "https://api.unsplash.com";

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
    links: Option<Links>,
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: Option<String>,
    full: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Links {
    html: Option<String>,
}

#[derive(Debug, Deserialize)]
struct User {
    name: Option<String>,
    links: Option<Links>,
}

pub struct UnsplashSource {
    client: Client,
    base_url: String,
    api_key: String,
    per_page: u32,
    limiter: DefaultDirectRateLimiter,
}

impl UnsplashSource {
    pub fn new(api_key: String, settings: &HttpSettings) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(settings)?,
            base_url: UNSPLASH_BASE_URL.to_string(),
            api_key,
            per_page: settings.per_page,
            limiter: rate_limiter(settings.requests_per_second),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn candidate(photo: Photo) -> Option<Candidate> {
        let url = photo.urls.regular.or(photo.urls.full)?;
        let mut candidate = Candidate::new(url, "unsplash");
        if let Some(html) = photo.links.and_then(|l| l.html) {
            candidate = candidate.with_source_url(html);
        }
        if let Some(user) = photo.user {
            if let Some(name) = user.name {
                candidate = candidate.with_author(name, user.links.and_then(|l| l.html));
            }
        }
        Some(candidate)
    }
}

#[async_trait]
impl MediaSource for UnsplashSource {
    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            id: "unsplash",
            capabilities: Capabilities::IMAGE,
            priority: 2,
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

        let url = format!("{}/search/photos", self.base_url.trim_end_matches('/'));
        tracing::debug!(source = "unsplash", %phrase, page, "Searching");

        let request = self
            .client
            .get(&url)
            .header("Authorization", format!("Client-ID {}", self.api_key))
            .header("Accept-Version", "v1")
            .query(&[
                ("query", phrase.to_string()),
                ("page", page.to_string()),
                ("per_page", self.per_page.to_string()),
            ]);

        Ok(get_json::<SearchPage>("unsplash", &self.limiter, request)
            .await?
            .results
            .into_iter()
            .filter_map(Self::candidate)
            .collect())
    }
}
