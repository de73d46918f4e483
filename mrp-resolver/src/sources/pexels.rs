//! Pexels source (photos and videos)
//!
//! - Photos: `GET /v1/search`
//! - Videos: `GET /videos/search`
//!
//! Authenticated with the raw API key in the `Authorization` header.

use super::http::{build_client, get_json, rate_limiter, HttpSettings};
use super::{Capabilities, MediaSource, SourceDescriptor, SourceError};
use crate::types::{Candidate, MediaKind};
use async_trait::async_trait;
use governor::DefaultDirectRateLimiter;
use reqwest::Client;
use serde::Deserialize;

const PEXELS_BASE_URL: &str = "https://api.pexels.com";

#[derive(Debug, Deserialize)]
struct PhotoPage {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    url: String,
    photographer: Option<String>,
    photographer_url: Option<String>,
    src: PhotoSources,
}

#[derive(Debug, Deserialize)]
struct PhotoSources {
    large2x: Option<String>,
    large: Option<String>,
    original: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoPage {
    #[serde(default)]
    videos: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    url: String,
    user: Option<VideoUser>,
    #[serde(default)]
    video_files: Vec<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct VideoUser {
    name: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    link: String,
    quality: Option<String>,
}

pub struct PexelsSource {
    client: Client,
    base_url: String,
    api_key: String,
    per_page: u32,
    limiter: DefaultDirectRateLimiter,
}

impl PexelsSource {
    pub fn new(api_key: String, settings: &HttpSettings) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(settings)?,
            base_url: PEXELS_BASE_URL.to_string(),
            api_key,
            per_page: settings.per_page,
            limiter: rate_limiter(settings.requests_per_second),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn photo_candidate(photo: Photo) -> Option<Candidate> {
        let url = photo.src.large2x.or(photo.src.large).or(photo.src.original)?;
        let mut candidate = Candidate::new(url, "pexels").with_source_url(photo.url);
        if let Some(name) = photo.photographer {
            candidate = candidate.with_author(name, photo.photographer_url);
        }
        Some(candidate)
    }

    fn video_candidate(video: Video) -> Option<Candidate> {
        // Prefer an HD rendition, else whatever comes first
        let file = video
            .video_files
            .iter()
            .find(|f| f.quality.as_deref() == Some("hd"))
            .or_else(|| video.video_files.first())?;
        let mut candidate = Candidate::new(file.link.clone(), "pexels").with_source_url(video.url);
        if let Some(user) = video.user {
            if let Some(name) = user.name {
                candidate = candidate.with_author(name, user.url);
            }
        }
        Some(candidate)
    }
}

#[async_trait]
impl MediaSource for PexelsSource {
    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            id: "pexels",
            capabilities: Capabilities::BOTH,
            priority: 1,
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
            MediaKind::Image => format!("{}/v1/search", base),
            MediaKind::Video => format!("{}/videos/search", base),
        };
        let query = [
            ("query", phrase.to_string()),
            ("page", page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];

        tracing::debug!(source = "pexels", %phrase, page, kind = %kind, "Searching");

        let request = self
            .client
            .get(&url)
            .header("Authorization", &self.api_key)
            .query(&query);

        let candidates = match kind {
            MediaKind::Image => get_json::<PhotoPage>("pexels", &self.limiter, request)
                .await?
                .photos
                .into_iter()
                .filter_map(Self::photo_candidate)
                .collect(),
            MediaKind::Video => get_json::<VideoPage>("pexels", &self.limiter, request)
                .await?
                .videos
                .into_iter()
                .filter_map(Self::video_candidate)
                .collect(),
        };
        Ok(candidates)
    }
}
