//! GIPHY source (short looping clips, served as video)
//!
//! `GET /v1/gifs/search` with offset pagination; pages are translated to
//! `offset = (page - 1) * limit`.

use super::http::{build_client, get_json, rate_limiter, HttpSettings};
use super::{Capabilities, MediaSource, SourceDescriptor, SourceError};
use crate::types::{Candidate, MediaKind};
use async_trait::async_trait;
use governor::DefaultDirectRateLimiter;
use reqwest::Client;
use serde::Deserialize;

const GIPHY_BASE_URL: &str = "https://api.giphy.com";

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<Gif>,
}

#[derive(Debug, Deserialize)]
struct Gif {
    url: Option<String>,
    images: GifImages,
    user: Option<GifUser>,
}

#[derive(Debug, Deserialize)]
struct GifImages {
    original: Option<Rendition>,
}

#[derive(Debug, Deserialize)]
struct Rendition {
    mp4: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GifUser {
    display_name: Option<String>,
    profile_url: Option<String>,
}

pub struct GiphySource {
    client: Client,
    base_url: String,
    api_key: String,
    limit: u32,
    limiter: DefaultDirectRateLimiter,
}

impl GiphySource {
    pub fn new(api_key: String, settings: &HttpSettings) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(settings)?,
            base_url: GIPHY_BASE_URL.to_string(),
            api_key,
            limit: settings.per_page,
            limiter: rate_limiter(settings.requests_per_second),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn offset(&self, page: u32) -> u32 {
        page.saturating_sub(1).saturating_mul(self.limit)
    }

    fn candidate(gif: Gif) -> Option<Candidate> {
        let original = gif.images.original?;
        let url = original.mp4.or(original.url).filter(|u| !u.is_empty())?;
        let mut candidate = Candidate::new(url, "giphy");
        if let Some(page) = gif.url {
            candidate = candidate.with_source_url(page);
        }
        if let Some(user) = gif.user {
            if let Some(name) = user.display_name.filter(|n| !n.is_empty()) {
                candidate = candidate.with_author(name, user.profile_url);
            }
        }
        Some(candidate)
    }
}

#[async_trait]
impl MediaSource for GiphySource {
    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            id: "giphy",
            capabilities: Capabilities::VIDEO,
            priority: 5,
        }
    }

    async fn search_page(
        &self,
        phrase: &str,
        kind: MediaKind,
        page: u32,
    ) -> Result<Vec<Candidate>, SourceError> {
        if kind != MediaKind::Video {
            return Err(SourceError::UnsupportedKind(kind));
        }

        let url = format!("{}/v1/gifs/search", self.base_url.trim_end_matches('/'));
        tracing::debug!(source = "giphy", %phrase, page, "Searching");

        let request = self.client.get(&url).query(&[
            ("api_key", self.api_key.clone()),
            ("q", phrase.to_string()),
            ("limit", self.limit.to_string()),
            ("offset", self.offset(page).to_string()),
            ("rating", "g".to_string()),
        ]);

        Ok(get_json::<SearchPage>("giphy", &self.limiter, request)
            .await?
            .data
            .into_iter()
            .filter_map(Self::candidate)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_page_translates_to_offset() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/gifs/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("offset".into(), "30".into()),
                Matcher::UrlEncoded("limit".into(), "15".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"data":[{"url":"https://giphy.com/gifs/x",
                "images":{"original":{"url":"https://media.giphy.com/x.gif","mp4":"https://media.giphy.com/x.mp4"}},
                "user":{"display_name":"Eve","profile_url":"https://giphy.com/eve"}}]}"#,
            )
            .create_async()
            .await;

        let source = GiphySource::new("g".into(), &HttpSettings::default())
            .unwrap()
            .with_base_url(server.url());
        let results = source.search_page("dance", MediaKind::Video, 3).await.unwrap();

        mock.assert_async().await;
        assert_eq!(results[0].url, "https://media.giphy.com/x.mp4");
        assert_eq!(results[0].author_name.as_deref(), Some("Eve"));
    }

    #[tokio::test]
    async fn test_image_is_unsupported() {
        let source = GiphySource::new("g".into(), &HttpSettings::default()).unwrap();
        assert!(source.search_page("x", MediaKind::Image, 1).await.is_err());
    }
}
