//! Pixabay source (photos and videos)
//!
//! - Photos: `GET /api/`
//! - Videos: `GET /api/videos/`
//!
//! The API key travels as the `key` query parameter. Pixabay rejects
//! `per_page` below 3.

use super::http::{build_client, get_json, rate_limiter, HttpSettings};
use super::{Capabilities, MediaSource, SourceDescriptor, SourceError};
use crate::types::{Candidate, MediaKind};
use async_trait::async_trait;
use governor::DefaultDirectRateLimiter;
use reqwest::Client;
use serde::Deserialize;

const PIXABAY_BASE_URL: &str = "https://pixabay.com";
const MIN_PER_PAGE: u32 = 3;

#[derive(Debug, Deserialize)]
struct SearchPage<T> {
    #[serde(default = "Vec::new")]
    hits: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ImageHit {
    #[serde(rename = "pageURL")]
    page_url: Option<String>,
    #[serde(rename = "largeImageURL")]
    large_image_url: Option<String>,
    #[serde(rename = "webformatURL")]
    webformat_url: Option<String>,
    user: Option<String>,
    user_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct VideoHit {
    #[serde(rename = "pageURL")]
    page_url: Option<String>,
    videos: VideoRenditions,
    user: Option<String>,
    user_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct VideoRenditions {
    large: Option<Rendition>,
    medium: Option<Rendition>,
    small: Option<Rendition>,
}

#[derive(Debug, Deserialize)]
struct Rendition {
    #[serde(default)]
    url: String,
}

fn author(candidate: Candidate, user: Option<String>, user_id: Option<u64>) -> Candidate {
    match user {
        Some(name) => {
            let profile = user_id.map(|id| format!("https://pixabay.com/users/{}-{}/", name, id));
            candidate.with_author(name, profile)
        }
        None => candidate,
    }
}

pub struct PixabaySource {
    client: Client,
    base_url: String,
    api_key: String,
    per_page: u32,
    limiter: DefaultDirectRateLimiter,
}

impl PixabaySource {
    pub fn new(api_key: String, settings: &HttpSettings) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(settings)?,
            base_url: PIXABAY_BASE_URL.to_string(),
            api_key,
            per_page: settings.per_page.max(MIN_PER_PAGE),
            limiter: rate_limiter(settings.requests_per_second),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn image_candidate(hit: ImageHit) -> Option<Candidate> {
        let url = hit.large_image_url.or(hit.webformat_url)?;
        let mut candidate = Candidate::new(url, "pixabay");
        if let Some(page) = hit.page_url {
            candidate = candidate.with_source_url(page);
        }
        Some(author(candidate, hit.user, hit.user_id))
    }

    fn video_candidate(hit: VideoHit) -> Option<Candidate> {
        let url = [hit.videos.medium, hit.videos.small, hit.videos.large]
            .into_iter()
            .flatten()
            .map(|r| r.url)
            .find(|u| !u.is_empty())?;
        let mut candidate = Candidate::new(url, "pixabay");
        if let Some(page) = hit.page_url {
            candidate = candidate.with_source_url(page);
        }
        Some(author(candidate, hit.user, hit.user_id))
    }
}

#[async_trait]
impl MediaSource for PixabaySource {
    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            id: "pixabay",
            capabilities: Capabilities::BOTH,
            priority: 3,
        }
    }

    async fn search_page(
        &self,
        phrase: &str,
        kind: MediaKind,
        page: u32,
    ) -> Result<Vec<Candidate>, SourceError> {
        let base = self.base_url.trim_end_matches('/');
        let url = match kind {
            MediaKind::Image => format!("{}/api/", base),
            MediaKind::Video => format!("{}/api/videos/", base),
        };
        let mut query = vec![
            ("key", self.api_key.clone()),
            ("q", phrase.to_string()),
            ("page", page.to_string()),
            ("per_page", self.per_page.to_string()),
            ("safesearch", "true".to_string()),
        ];
        if kind == MediaKind::Image {
            query.push(("image_type", "photo".to_string()));
        }

        tracing::debug!(source = "pixabay", %phrase, page, kind = %kind, "Searching");

        let request = self.client.get(&url).query(&query);

        let candidates = match kind {
            MediaKind::Image => get_json::<SearchPage<ImageHit>>("pixabay", &self.limiter, request)
                .await?
                .hits
                .into_iter()
                .filter_map(Self::image_candidate)
                .collect(),
            MediaKind::Video => get_json::<SearchPage<VideoHit>>("pixabay", &self.limiter, request)
                .await?
                .hits
                .into_iter()
                .filter_map(Self::video_candidate)
                .collect(),
        };
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_image_search_builds_author_profile() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("key".into(), "px".into()),
                Matcher::UrlEncoded("q".into(), "cat".into()),
                Matcher::UrlEncoded("image_type".into(), "photo".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"total":1,"hits":[{"pageURL":"https://pixabay.com/photos/cat-1/",
                "largeImageURL":"https://cdn.pixabay.com/cat.jpg","user":"meow","user_id":42}]}"#,
            )
            .create_async()
            .await;

        let source = PixabaySource::new("px".into(), &HttpSettings::default())
            .unwrap()
            .with_base_url(server.url());
        let results = source.search_page("cat", MediaKind::Image, 1).await.unwrap();

        mock.assert_async().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://cdn.pixabay.com/cat.jpg");
        assert_eq!(
            results[0].author_url.as_deref(),
            Some("https://pixabay.com/users/meow-42/")
        );
    }

    #[tokio::test]
    async fn test_video_search_skips_empty_renditions() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/videos/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"hits":[{"videos":{"medium":{"url":""},"small":{"url":"https://v/small.mp4"}}}]}"#,
            )
            .create_async()
            .await;

        let source = PixabaySource::new("px".into(), &HttpSettings::default())
            .unwrap()
            .with_base_url(server.url());
        let results = source.search_page("sea", MediaKind::Video, 1).await.unwrap();
        assert_eq!(results[0].url, "https://v/small.mp4");
        assert!(results[0].author_name.is_none());
    }

    #[test]
    fn test_per_page_minimum() {
        let settings = HttpSettings {
            per_page: 1,
            ..HttpSettings::default()
        };
        let source = PixabaySource::new("px".into(), &settings).unwrap();
        assert_eq!(source.per_page, 3);
    }
}
