//! HTTP plumbing shared by the source adapters

use super::SourceError;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use mrp_common::config::SourcesConfig;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::Duration;

/// Settings every adapter is built from
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub per_page: u32,
    pub requests_per_second: u32,
}

impl HttpSettings {
    pub fn from_config(config: &SourcesConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            per_page: config.per_page.max(1),
            requests_per_second: config.requests_per_second,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self::from_config(&SourcesConfig::default())
    }
}

pub fn build_client(settings: &HttpSettings) -> Result<Client, SourceError> {
    Client::builder()
        .timeout(settings.timeout)
        .connect_timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| SourceError::Network(e.to_string()))
}

/// Direct limiter allowing `requests_per_second` calls (minimum 1)
pub fn rate_limiter(requests_per_second: u32) -> DefaultDirectRateLimiter {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(rate))
}

/// Wait for the limiter, send, map status codes, decode JSON
pub async fn get_json<T: DeserializeOwned>(
    source: &'static str,
    limiter: &DefaultDirectRateLimiter,
    request: RequestBuilder,
) -> Result<T, SourceError> {
    limiter.until_ready().await;

    let response = request
        .send()
        .await
        .map_err(|e| SourceError::Network(e.to_string()))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceError::RateLimited);
    }
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(SourceError::Api(status.as_u16(), error_text));
    }

    let body = response
        .json::<T>()
        .await
        .map_err(|e| SourceError::Parse(format!("{}: {}", source, e)))?;
    Ok(body)
}
