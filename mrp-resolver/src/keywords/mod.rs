//! Keyword optimizer
//!
//! Turns an entry's description (and subject word) into a short search query
//! using a priority-ordered cascade of text-generation providers:
//!
//! 1. Cache lookup, only when a phrase to avoid is given (regeneration).
//!    First-time generation skips the cache so repeated requests vary.
//! 2. Providers in order; each is skipped without a call when its daily
//!    budget is spent, and a failure moves on to the next one.
//! 3. The first usable answer is cleaned, tokenized and cached under
//!    (description, word, avoid).
//!
//! The optimizer never fails: when no provider produces a result it returns
//! `None` and the caller falls back to its local phrase.

pub mod cache;
pub mod prompt;
pub mod providers;
pub mod quota;
pub mod store;

pub use cache::{CacheKey, KeywordCache};
pub use providers::{ChatCompletionsProvider, GeminiProvider, ProviderError, TextProvider};
pub use store::{KeywordStore, KeywordStoreStats};

use mrp_common::config::{ApiKeys, KeywordConfig};
use prompt::{build_prompt, clean_response, ThemeRotation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Optimizer output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizedKeywords {
    /// Cleaned provider text
    pub phrase: String,
    pub keywords: Vec<String>,
    /// Keywords joined with single spaces
    pub search_query: String,
    /// Provider that produced the text
    pub provider: String,
    /// Served from the cache
    pub cached: bool,
}

/// A provider and its daily call budget
#[derive(Clone)]
pub struct ProviderSlot {
    pub provider: Arc<dyn TextProvider>,
    pub daily_limit: u32,
}

impl ProviderSlot {
    pub fn new(provider: Arc<dyn TextProvider>, daily_limit: u32) -> Self {
        Self {
            provider,
            daily_limit,
        }
    }
}

/// Cache + quota + provider cascade
pub struct KeywordOptimizer {
    providers: Vec<ProviderSlot>,
    store: Arc<KeywordStore>,
    themes: ThemeRotation,
}

impl KeywordOptimizer {
    /// Optimizer over `providers`, tried in the given order
    pub fn new(providers: Vec<ProviderSlot>, store: Arc<KeywordStore>) -> Self {
        Self {
            providers,
            store,
            themes: ThemeRotation::new(),
        }
    }

    /// Build the Gemini → Groq → OpenRouter cascade from configuration
    ///
    /// Providers without an API key are left out.
    pub fn from_config(
        keywords: &KeywordConfig,
        api_keys: &ApiKeys,
        store: Arc<KeywordStore>,
    ) -> Self {
        let mut providers = Vec::new();

        match api_keys.resolve("gemini") {
            Some(key) => match GeminiProvider::new(key, keywords.gemini_model.clone()) {
                Ok(p) => providers.push(ProviderSlot::new(Arc::new(p), keywords.gemini_daily_limit)),
                Err(e) => warn!(provider = "gemini", error = %e, "Provider unavailable"),
            },
            None => info!(provider = "gemini", "No API key configured, provider disabled"),
        }

        match api_keys.resolve("groq") {
            Some(key) => match ChatCompletionsProvider::groq(key, keywords.groq_model.clone()) {
                Ok(p) => providers.push(ProviderSlot::new(Arc::new(p), keywords.groq_daily_limit)),
                Err(e) => warn!(provider = "groq", error = %e, "Provider unavailable"),
            },
            None => info!(provider = "groq", "No API key configured, provider disabled"),
        }

        match api_keys.resolve("openrouter") {
            Some(key) => {
                match ChatCompletionsProvider::openrouter(key, keywords.openrouter_model.clone()) {
                    Ok(p) => providers.push(ProviderSlot::new(
                        Arc::new(p),
                        keywords.openrouter_daily_limit,
                    )),
                    Err(e) => warn!(provider = "openrouter", error = %e, "Provider unavailable"),
                }
            }
            None => debug!(provider = "openrouter", "No API key configured, provider disabled"),
        }

        Self::new(providers, store)
    }

    pub fn store(&self) -> &Arc<KeywordStore> {
        &self.store
    }

    /// Names of the configured providers, in cascade order
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|s| s.provider.name()).collect()
    }

    /// Produce an optimized search query, or `None` if every provider was
    /// skipped or failed
    pub async fn optimize(
        &self,
        description: &str,
        word: Option<&str>,
        avoid: Option<&str>,
    ) -> Option<OptimizedKeywords> {
        let key = CacheKey::new(description, word, avoid);

        if avoid.is_some() {
            if let Some(hit) = self.store.lookup(&key).await {
                debug!(provider = %hit.provider, query = %hit.search_query, "Keyword cache hit");
                return Some(hit);
            }
        }

        let theme = self.themes.next_theme();
        let prompt = build_prompt(description, word, avoid, theme);

        for slot in &self.providers {
            let name = slot.provider.name();

            if !self.store.try_acquire(name, slot.daily_limit).await {
                warn!(provider = name, limit = slot.daily_limit, "Daily quota spent, skipping provider");
                continue;
            }

            let raw = match slot.provider.generate(&prompt).await {
                Ok(raw) => raw,
                Err(ProviderError::RateLimited) => {
                    warn!(provider = name, "Provider rate limited, skipping for the rest of the day");
                    self.store.exhaust(name, slot.daily_limit).await;
                    continue;
                }
                Err(e) => {
                    warn!(provider = name, error = %e, "Keyword generation failed, trying next provider");
                    continue;
                }
            };

            let Some(cleaned) = clean_response(&raw) else {
                warn!(provider = name, "Provider returned no usable keywords");
                continue;
            };

            let result = OptimizedKeywords {
                search_query: cleaned.search_query(),
                phrase: cleaned.phrase,
                keywords: cleaned.keywords,
                provider: name.to_string(),
                cached: false,
            };

            info!(provider = name, theme, query = %result.search_query, "Generated keywords");
            self.store.remember(key, result.clone()).await;
            return Some(result);
        }

        warn!(description, "No provider produced keywords");
        None
    }
}
