//! Shared fixtures for resolver integration tests
//!
//! Fake sources and providers with scripted answers, plus a builder wiring
//! them into a [`Resolver`] driven by a manual clock.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mrp_common::config::{PhraseConfig, ResolverConfig};
use mrp_common::ManualClock;
use mrp_resolver::keywords::ProviderError;
use mrp_resolver::sources::{Capabilities, SourceDescriptor, SourceError};
use mrp_resolver::{
    Candidate, KeywordOptimizer, KeywordStore, MediaKind, MediaSource, ProviderSlot,
    RegisteredSource, Resolver, SourceSet, TextProvider,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
    ))
}

/// Source serving fixed pages
pub struct FakeSource {
    id: &'static str,
    priority: u32,
    capabilities: Capabilities,
    pages: HashMap<u32, Vec<String>>,
    delay: Duration,
    fail: bool,
    pub phrases: Mutex<Vec<String>>,
    pub pages_requested: Mutex<Vec<u32>>,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(id: &'static str, priority: u32) -> Self {
        Self {
            id,
            priority,
            capabilities: Capabilities::BOTH,
            pages: HashMap::new(),
            delay: Duration::ZERO,
            fail: false,
            phrases: Mutex::new(Vec::new()),
            pages_requested: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn page(mut self, page: u32, urls: &[&str]) -> Self {
        self.pages.insert(page, urls.iter().map(|u| u.to_string()).collect());
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn images_only(mut self) -> Self {
        self.capabilities = Capabilities::IMAGE;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_phrase(&self) -> Option<String> {
        self.phrases.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl MediaSource for FakeSource {
    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            id: self.id,
            capabilities: self.capabilities,
            priority: self.priority,
        }
    }

    async fn search_page(
        &self,
        phrase: &str,
        _kind: MediaKind,
        page: u32,
    ) -> Result<Vec<Candidate>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.phrases.lock().unwrap().push(phrase.to_string());
        self.pages_requested.lock().unwrap().push(page);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(SourceError::Network("connection refused".to_string()));
        }
        Ok(self
            .pages
            .get(&page)
            .map(|urls| {
                urls.iter()
                    .map(|u| Candidate::new(u.clone(), self.id))
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Provider answering every prompt with the same text, or failing
pub struct FakeProvider {
    name: &'static str,
    reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn replying(name: &'static str, reply: &str) -> Self {
        Self {
            name,
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextProvider for FakeProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| ProviderError::Api(500, "upstream error".to_string()))
    }
}

/// Builder for a resolver over fake collaborators
pub struct Harness {
    pub clock: Arc<ManualClock>,
    sources: Vec<RegisteredSource>,
    providers: Vec<ProviderSlot>,
    phrase: PhraseConfig,
    settings: ResolverConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            clock: manual_clock(),
            sources: Vec::new(),
            providers: Vec::new(),
            phrase: PhraseConfig::default(),
            settings: ResolverConfig::default(),
        }
    }

    pub fn source(mut self, source: Arc<FakeSource>) -> Self {
        self.sources.push(RegisteredSource::new(source));
        self
    }

    pub fn provider(mut self, provider: Arc<FakeProvider>, daily_limit: u32) -> Self {
        self.providers.push(ProviderSlot::new(provider, daily_limit));
        self
    }

    pub fn image_prefix(mut self, prefix: &str) -> Self {
        self.phrase.image_prefix = prefix.to_string();
        self
    }

    pub fn discard_stale(mut self) -> Self {
        self.settings.discard_stale_results = true;
        self
    }

    pub fn placeholder_template(mut self, template: &str) -> Self {
        self.settings.placeholder_template = template.to_string();
        self
    }

    pub fn build(self) -> Resolver {
        let store = Arc::new(KeywordStore::new(
            100,
            chrono::Duration::hours(24),
            self.clock.clone(),
        ));
        let optimizer = Arc::new(KeywordOptimizer::new(self.providers, store));
        Resolver::new(SourceSet::new(self.sources), optimizer, self.clock)
            .with_phrase_config(self.phrase)
            .with_settings(self.settings)
    }
}
